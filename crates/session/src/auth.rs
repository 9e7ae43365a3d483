use crate::session_store::SessionStore;
use crate::storage::SafeStorage;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Durable key holding the signed-in identity
pub const USER_KEY: &str = "sui_wallet_user";

pub const GOOGLE_PROVIDER: &str = "google";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub address: String,
    pub provider: String,
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Signed-in identity, persisted across runs independently of the session.
pub struct AuthContext {
    storage: SafeStorage,
    user: Option<UserIdentity>,
    loading: bool,
}

impl AuthContext {
    /// Context that has not read durable state yet.
    pub fn new(storage: SafeStorage) -> Self {
        Self {
            storage,
            user: None,
            loading: true,
        }
    }

    /// Restore the persisted identity. A record that fails to parse is removed.
    pub fn initialize(&mut self) {
        self.loading = true;
        self.user = match self.storage.get(USER_KEY) {
            Some(raw) => match serde_json::from_str::<UserIdentity>(&raw) {
                Ok(user) => {
                    info!("Restored identity {}", user.address);
                    Some(user)
                }
                Err(e) => {
                    warn!("Removing corrupt identity record: {}", e);
                    self.storage.remove(USER_KEY);
                    None
                }
            },
            None => None,
        };
        self.loading = false;
    }

    pub fn login(&mut self, identity: UserIdentity) {
        match serde_json::to_string(&identity) {
            Ok(json) => {
                self.storage.set(USER_KEY, &json);
            }
            Err(e) => warn!("Failed to serialize identity: {}", e),
        }
        info!("Logged in as {}", identity.address);
        self.user = Some(identity);
    }

    pub fn logout(&mut self, session: &mut SessionStore) {
        self.user = None;
        self.storage.remove(USER_KEY);
        session.clear();
        info!("Logged out");
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn user(&self) -> Option<&UserIdentity> {
        self.user.as_ref()
    }

    /// Identity previously persisted for this subject, if any.
    pub fn persisted_for(&self, provider: &str, sub: &str) -> Option<UserIdentity> {
        self.storage
            .get(USER_KEY)
            .and_then(|raw| serde_json::from_str::<UserIdentity>(&raw).ok())
            .filter(|u| u.provider == provider && u.sub == sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage, Storage};
    use std::sync::Arc;

    fn identity() -> UserIdentity {
        UserIdentity {
            address: "0xabc".into(),
            provider: GOOGLE_PROVIDER.into(),
            sub: "1234".into(),
            email: Some("user@example.com".into()),
            name: None,
        }
    }

    #[test]
    fn test_login_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let durable = || SafeStorage::new(Arc::new(FileStorage::open(dir.path()).unwrap()));

        let mut auth = AuthContext::new(durable());
        assert!(auth.is_loading());
        auth.initialize();
        assert!(!auth.is_loading());
        assert!(!auth.is_authenticated());
        auth.login(identity());

        let mut restarted = AuthContext::new(durable());
        restarted.initialize();
        assert_eq!(restarted.user(), Some(&identity()));
    }

    #[test]
    fn test_corrupt_record_is_removed() {
        let memory = Arc::new(MemoryStorage::new());
        memory.set_item(USER_KEY, "{oops").unwrap();

        let mut auth = AuthContext::new(SafeStorage::new(memory.clone()));
        auth.initialize();
        assert!(!auth.is_authenticated());
        assert_eq!(memory.get_item(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_logout_clears_identity_and_session() {
        let memory = Arc::new(MemoryStorage::new());
        let mut auth = AuthContext::new(SafeStorage::new(memory.clone()));
        auth.initialize();
        auth.login(identity());
        assert!(auth.persisted_for(GOOGLE_PROVIDER, "1234").is_some());
        assert!(auth.persisted_for(GOOGLE_PROVIDER, "other").is_none());

        let mut session = SessionStore::new(SafeStorage::memory());
        session.set_ephemeral_key("suiprivkey1example");
        auth.logout(&mut session);

        assert!(!auth.is_authenticated());
        assert_eq!(memory.get_item(USER_KEY).unwrap(), None);
        assert!(session.ephemeral_key().is_none());
    }
}
