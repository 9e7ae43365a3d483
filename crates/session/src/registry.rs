use crate::storage::SafeStorage;

const SECRET_FLAG_PREFIX: &str = "zklogin_secret_set";

/// Durable record of which principals have completed first-time PIN setup.
/// Only a flag is stored, never the PIN.
#[derive(Clone)]
pub struct SecretRegistry {
    storage: SafeStorage,
}

impl SecretRegistry {
    pub fn new(storage: SafeStorage) -> Self {
        Self { storage }
    }

    fn key(provider: &str, sub: &str) -> String {
        format!("{}:{}:{}", SECRET_FLAG_PREFIX, provider, sub)
    }

    pub fn is_registered(&self, provider: &str, sub: &str) -> bool {
        self.storage.get(&Self::key(provider, sub)).as_deref() == Some("true")
    }

    pub fn mark_registered(&self, provider: &str, sub: &str) {
        self.storage.set(&Self::key(provider, sub), "true");
    }

    pub fn forget(&self, provider: &str, sub: &str) {
        self.storage.remove(&Self::key(provider, sub));
    }
}
