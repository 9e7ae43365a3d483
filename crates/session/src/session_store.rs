use crate::storage::SafeStorage;
use std::fmt;
use tracing::{debug, warn};
use zklogin::{UserSecret, ZkProof};

pub const EPHEMERAL_KEY_KEY: &str = "zklogin_ephemeral_key";
pub const PROOF_KEY: &str = "zklogin_proof";
pub const MAX_EPOCH_KEY: &str = "zklogin_max_epoch";

/// Everything needed to sign for a zkLogin account until `max_epoch`.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// bech32 `suiprivkey` encoding of the ephemeral secret
    pub ephemeral_key: String,
    pub proof: ZkProof,
    pub max_epoch: u64,
    pub user_secret: Option<UserSecret>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("max_epoch", &self.max_epoch)
            .field("address_seed", &self.proof.address_seed)
            .field("has_user_secret", &self.user_secret.is_some())
            .finish_non_exhaustive()
    }
}

/// Account a held secret was entered for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SecretOwner {
    provider: String,
    sub: String,
}

/// Tab-scoped session record. The user secret is held in memory only and
/// never reaches the storage backend.
pub struct SessionStore {
    storage: SafeStorage,
    user_secret: Option<UserSecret>,
    secret_owner: Option<SecretOwner>,
    track_user_secret: bool,
}

impl SessionStore {
    pub fn new(storage: SafeStorage) -> Self {
        Self {
            storage,
            user_secret: None,
            secret_owner: None,
            track_user_secret: false,
        }
    }

    /// Store that also requires the user secret for a session to count as present.
    pub fn tracking_user_secret(storage: SafeStorage) -> Self {
        Self {
            track_user_secret: true,
            ..Self::new(storage)
        }
    }

    pub fn get(&self) -> Option<Session> {
        let ephemeral_key = self.ephemeral_key()?;
        let proof = self.proof()?;
        let max_epoch = self.max_epoch()?;
        if self.track_user_secret && self.user_secret.is_none() {
            return None;
        }

        Some(Session {
            ephemeral_key,
            proof,
            max_epoch,
            user_secret: self.user_secret.clone(),
        })
    }

    pub fn set(&mut self, session: Session) {
        self.set_ephemeral_key(&session.ephemeral_key);
        self.set_proof(&session.proof);
        self.set_max_epoch(session.max_epoch);
        self.user_secret = session.user_secret;
        self.secret_owner = None;
        debug!("Session stored (max epoch {})", session.max_epoch);
    }

    pub fn clear(&mut self) {
        self.storage.remove(EPHEMERAL_KEY_KEY);
        self.storage.remove(PROOF_KEY);
        self.storage.remove(MAX_EPOCH_KEY);
        self.user_secret = None;
        self.secret_owner = None;
        debug!("Session cleared");
    }

    pub fn is_valid(&self) -> bool {
        self.get().is_some()
    }

    pub fn ephemeral_key(&self) -> Option<String> {
        self.storage.get(EPHEMERAL_KEY_KEY).filter(|k| !k.is_empty())
    }

    pub fn set_ephemeral_key(&self, key: &str) {
        self.storage.set(EPHEMERAL_KEY_KEY, key);
    }

    pub fn proof(&self) -> Option<ZkProof> {
        let raw = self.storage.get(PROOF_KEY).filter(|p| !p.is_empty())?;
        match ZkProof::from_json(&raw) {
            Ok(proof) => Some(proof),
            Err(e) => {
                warn!("Ignoring stored proof: {}", e);
                None
            }
        }
    }

    pub fn set_proof(&self, proof: &ZkProof) {
        match proof.to_json() {
            Ok(json) => {
                self.storage.set(PROOF_KEY, &json);
            }
            Err(e) => warn!("Failed to serialize proof: {}", e),
        }
    }

    pub fn max_epoch(&self) -> Option<u64> {
        self.storage
            .get(MAX_EPOCH_KEY)
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|epoch| *epoch > 0)
    }

    pub fn set_max_epoch(&self, max_epoch: u64) {
        self.storage.set(MAX_EPOCH_KEY, &max_epoch.to_string());
    }

    pub fn has_user_secret(&self) -> bool {
        self.user_secret.is_some()
    }

    pub fn user_secret(&self) -> Option<&UserSecret> {
        self.user_secret.as_ref()
    }

    pub fn set_user_secret(&mut self, secret: Option<UserSecret>) {
        self.user_secret = secret;
        self.secret_owner = None;
    }

    /// Record which account the held secret belongs to. No-op without a secret.
    pub fn bind_user_secret(&mut self, provider: &str, sub: &str) {
        if self.user_secret.is_some() {
            self.secret_owner = Some(SecretOwner {
                provider: provider.to_string(),
                sub: sub.to_string(),
            });
        }
    }

    /// The held secret, but only if it was bound to this account.
    pub fn user_secret_for(&self, provider: &str, sub: &str) -> Option<&UserSecret> {
        match &self.secret_owner {
            Some(owner) if owner.provider == provider && owner.sub == sub => self.user_secret.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, Storage, UnavailableStorage};
    use std::sync::Arc;
    use zklogin::{IssBase64Details, ProofPoints};

    fn proof() -> ZkProof {
        ZkProof {
            proof_points: ProofPoints {
                a: vec!["1".into(), "2".into(), "1".into()],
                b: vec![vec!["3".into(), "4".into()], vec!["5".into(), "6".into()], vec!["1".into(), "0".into()]],
                c: vec!["7".into(), "8".into(), "1".into()],
            },
            iss_base64_details: IssBase64Details {
                value: "wiaXNzIjoi".into(),
                index_mod_4: 1,
            },
            header_base64: "eyJhbGciOiJSUzI1NiJ9".into(),
            address_seed: "42".into(),
        }
    }

    fn session(secret: Option<&str>) -> Session {
        Session {
            ephemeral_key: "suiprivkey1example".into(),
            proof: proof(),
            max_epoch: 12,
            user_secret: secret.map(|s| UserSecret::new(s).unwrap()),
        }
    }

    fn backend() -> (Arc<MemoryStorage>, SafeStorage) {
        let memory = Arc::new(MemoryStorage::new());
        let safe = SafeStorage::new(memory.clone());
        (memory, safe)
    }

    #[test]
    fn test_set_then_get() {
        let (_, storage) = backend();
        let mut store = SessionStore::new(storage);
        assert!(store.get().is_none());

        store.set(session(Some("123456")));
        assert_eq!(store.get(), Some(session(Some("123456"))));
        assert!(store.is_valid());
    }

    #[test]
    fn test_clear_removes_everything() {
        let (memory, storage) = backend();
        let mut store = SessionStore::new(storage);
        store.set(session(Some("123456")));
        store.clear();

        assert!(store.get().is_none());
        assert!(!store.is_valid());
        assert!(!store.has_user_secret());
        assert_eq!(memory.get_item(PROOF_KEY).unwrap(), None);
    }

    #[test]
    fn test_missing_field_invalidates() {
        let (memory, storage) = backend();
        let mut store = SessionStore::new(storage);
        store.set(session(None));

        memory.set_item(MAX_EPOCH_KEY, "0").unwrap();
        assert!(store.get().is_none());
        assert_eq!(store.is_valid(), store.get().is_some());

        store.set_max_epoch(12);
        memory.set_item(EPHEMERAL_KEY_KEY, "").unwrap();
        assert!(!store.is_valid());

        store.set_ephemeral_key("suiprivkey1example");
        memory.set_item(PROOF_KEY, "{\"broken\":true}").unwrap();
        assert!(!store.is_valid());
    }

    #[test]
    fn test_tracked_secret_is_required() {
        let (_, storage) = backend();
        let mut store = SessionStore::tracking_user_secret(storage);
        store.set(session(None));
        assert!(store.get().is_none());

        store.set_user_secret(Some(UserSecret::new("123456").unwrap()));
        assert!(store.is_valid());
    }

    #[test]
    fn test_secret_never_reaches_storage() {
        let (memory, storage) = backend();
        let mut store = SessionStore::new(storage);
        store.set(session(Some("918273")));

        for key in [EPHEMERAL_KEY_KEY, PROOF_KEY, MAX_EPOCH_KEY] {
            let value = memory.get_item(key).unwrap().unwrap_or_default();
            assert!(!value.contains("918273"));
        }
        assert!(!format!("{:?}", store.get().unwrap()).contains("918273"));
    }

    #[test]
    fn test_held_secret_only_answers_for_its_account() {
        let (_, storage) = backend();
        let mut store = SessionStore::tracking_user_secret(storage);
        store.set(session(Some("222222")));
        assert!(store.user_secret_for("google", "sub-b").is_none());

        store.bind_user_secret("google", "sub-b");
        assert_eq!(store.user_secret_for("google", "sub-b").unwrap().expose(), "222222");
        assert!(store.user_secret_for("google", "sub-a").is_none());

        // A later login for another account replaces the secret and its owner
        store.set(session(Some("111111")));
        store.bind_user_secret("google", "sub-a");
        assert!(store.user_secret_for("google", "sub-b").is_none());
        assert_eq!(store.user_secret_for("google", "sub-a").unwrap().expose(), "111111");

        store.clear();
        assert!(store.user_secret_for("google", "sub-a").is_none());
    }

    #[test]
    fn test_unavailable_storage_reads_as_absent() {
        let mut store = SessionStore::new(SafeStorage::new(Arc::new(UnavailableStorage::new("off"))));
        store.set(session(None));
        assert!(store.get().is_none());
        store.clear();
    }
}
