// Module declarations
pub mod auth;
pub mod error;
pub mod registry;
pub mod session_store;
pub mod storage;

// Re-export commonly used types
pub use auth::{AuthContext, UserIdentity, GOOGLE_PROVIDER, USER_KEY};
pub use error::StorageError;
pub use registry::SecretRegistry;
pub use session_store::{Session, SessionStore};
pub use storage::{FileStorage, MemoryStorage, SafeStorage, Storage, UnavailableStorage};
