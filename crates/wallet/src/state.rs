use crate::config::Config;
use crate::flow::LoginFlow;
use session::{AuthContext, FileStorage, MemoryStorage, SafeStorage, SecretRegistry, SessionStore, UnavailableStorage};
use std::sync::Arc;
use sui::ChainClient;
use tracing::warn;
use zklogin::{HttpProver, MockProver, Prover};

fn missing_provider() -> ! {
    panic!("auth context used outside its provider: call WalletState::mount_auth first")
}

/// Application state shared by the shell and the one-shot commands.
pub struct WalletState {
    pub config: Config,
    pub chain: ChainClient,
    pub session: SessionStore,
    pub registry: SecretRegistry,
    pub flow: LoginFlow,
    prover: Box<dyn Prover>,
    durable: SafeStorage,
    auth: Option<AuthContext>,
}

impl WalletState {
    /// Wire storage, chain access and prover from `config`. The auth context
    /// is not mounted yet.
    pub fn new(config: Config) -> Self {
        let durable = match FileStorage::open(&config.data_dir) {
            Ok(storage) => SafeStorage::new(Arc::new(storage)),
            Err(e) => {
                warn!("Durable storage at {} unavailable: {}", config.data_dir.display(), e);
                SafeStorage::new(Arc::new(UnavailableStorage::new(e.to_string())))
            }
        };
        let prover: Box<dyn Prover> = if config.mock_prover {
            warn!("Using the mock prover; proofs will not verify on chain");
            Box::new(MockProver)
        } else {
            Box::new(HttpProver::new(config.prover_url.clone()))
        };
        let chain = ChainClient::new(config.rpc_url());
        Self::with_parts(config, chain, durable, prover)
    }

    /// Build around explicit collaborators.
    pub fn with_parts(config: Config, chain: ChainClient, durable: SafeStorage, prover: Box<dyn Prover>) -> Self {
        let session = SessionStore::tracking_user_secret(SafeStorage::new(Arc::new(MemoryStorage::new())));
        let flow = LoginFlow::new(config.oauth(), config.max_epoch_offset);
        Self {
            registry: SecretRegistry::new(durable.clone()),
            config,
            chain,
            session,
            flow,
            prover,
            durable,
            auth: None,
        }
    }

    /// Create the auth context and restore any persisted identity.
    pub fn mount_auth(&mut self) {
        let mut auth = AuthContext::new(self.durable.clone());
        auth.initialize();
        self.auth = Some(auth);
    }

    /// # Panics
    /// If called before [`WalletState::mount_auth`].
    pub fn auth(&self) -> &AuthContext {
        match &self.auth {
            Some(auth) => auth,
            None => missing_provider(),
        }
    }

    /// # Panics
    /// If called before [`WalletState::mount_auth`].
    pub fn auth_mut(&mut self) -> &mut AuthContext {
        match &mut self.auth {
            Some(auth) => auth,
            None => missing_provider(),
        }
    }

    pub fn prover(&self) -> &dyn Prover {
        self.prover.as_ref()
    }

    /// Run the pending proof request against the configured prover.
    pub async fn request_proof(&mut self) -> Result<String, crate::flow::FlowError> {
        self.flow.request_proof(self.prover.as_ref()).await
    }

    /// Commit the finished login flow into session, registry and auth.
    pub fn complete_login(&mut self) -> Result<session::UserIdentity, crate::flow::FlowError> {
        let auth = match &mut self.auth {
            Some(auth) => auth,
            None => missing_provider(),
        };
        self.flow.complete(&mut self.session, auth, &self.registry)
    }

    pub fn logout(&mut self) {
        let auth = match &mut self.auth {
            Some(auth) => auth,
            None => missing_provider(),
        };
        auth.logout(&mut self.session);
        self.flow.cancel();
    }
}
