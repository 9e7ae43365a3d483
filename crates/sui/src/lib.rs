// Module declarations
pub mod address;
pub mod balances;
pub mod chain;
pub mod coins;
pub mod error;
pub mod history;
pub mod network;
pub mod rpc;
pub mod tokens;
pub mod transfer;

// Re-export commonly used types
pub use balances::TokenBalance;
pub use chain::{ChainClient, EpochSource};
pub use coins::CoinInfo;
pub use error::{ChainError, TransferError};
pub use history::{Direction, TransactionRecord, TxStatus};
pub use network::Network;
pub use tokens::{TokenInfo, SUI_COIN_TYPE};
pub use transfer::{
    build_transfer, ensure_session_active, execute_swap, quote_swap, sign_and_submit,
    SwapQuote, TransferRequest,
};
