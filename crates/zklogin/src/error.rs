use thiserror::Error;

pub type Result<T> = std::result::Result<T, ZkLoginError>;

/// Errors raised while preparing zkLogin material
#[derive(Debug, Error)]
pub enum ZkLoginError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("invalid ephemeral key: {0}")]
    InvalidKey(String),

    #[error("{0}")]
    InvalidSecret(String),

    #[error("derivation failed: {0}")]
    Derivation(String),

    #[error("invalid proof: {0}")]
    InvalidProof(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<bcs::Error> for ZkLoginError {
    fn from(err: bcs::Error) -> Self {
        ZkLoginError::Serialization(err.to_string())
    }
}
