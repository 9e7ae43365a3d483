// Module declarations
pub mod callback;
pub mod config;
pub mod flow;
pub mod logging;
pub mod shell;
pub mod state;

// Re-export commonly used types
pub use config::Config;
pub use flow::{FlowError, LoginFlow, SaltPrompt};
pub use state::WalletState;
