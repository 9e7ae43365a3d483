use thiserror::Error;

/// Failures reading from or submitting to a full node
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("rpc request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rpc endpoint returned {0}")]
    Status(u16),

    #[error("{method} failed ({code}): {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    #[error("unexpected {method} response: {reason}")]
    Decode { method: String, reason: String },

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient {coin_type} balance: need {required}, have {available}")]
    InsufficientBalance {
        coin_type: String,
        required: u128,
        available: u128,
    },

    #[error("session expired at epoch {max_epoch} (current epoch {current_epoch}), please log in again")]
    SessionExpired { max_epoch: u64, current_epoch: u64 },

    #[error("failed to build transaction: {0}")]
    Build(String),

    #[error("failed to sign transaction: {0}")]
    Signing(#[from] zklogin::ZkLoginError),

    #[error("transaction {digest} failed: {reason}")]
    Rejected { digest: String, reason: String },

    #[error("unknown token: {0}")]
    UnknownToken(String),

    #[error("swaps are not available yet")]
    SwapUnavailable,

    #[error(transparent)]
    Chain(#[from] ChainError),
}
