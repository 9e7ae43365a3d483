//! zkLogin sign-in as an explicit state machine.
//!
//! ```text
//! Idle -> AwaitingRedirect -> CallbackReceived -> SaltRequired
//!      -> ProofRequested -> AddressDerived -> Complete -> Idle
//! ```
//!
//! A completed flow counts as idle for the next `begin`.
//! Nothing is written to the session, the identity record or the secret
//! registry before [`LoginFlow::complete`]. A secret that fails validation
//! leaves the flow in `SaltRequired`; any other failure drops back to `Idle`.
//! A PIN already held for the same account skips `SaltRequired` entirely.

use session::{AuthContext, GOOGLE_PROVIDER, SecretRegistry, Session, SessionStore, UserIdentity};
use sui::EpochSource;
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;
use zklogin::{
    EphemeralKeyPair, IdentityClaims, KEY_CLAIM_NAME, OAuthConfig, ProofRequest, Prover, UserSecret, ZkLoginError,
    ZkProof, address_seed, derive_address, extract_id_token, format_address, generate_nonce, generate_randomness,
    identity_claims,
};

/// Fallback issuer when the token omits `iss`
const DEFAULT_ISSUER: &str = "https://accounts.google.com";

#[derive(Debug, Error)]
pub enum FlowError {
    /// Bad user input; the flow stays where it was.
    #[error("{0}")]
    Validation(String),

    #[error("a login is already in progress")]
    AlreadyInProgress,

    #[error("cannot {action} while {state}")]
    InvalidState { action: &'static str, state: &'static str },

    #[error("login failed, please try again ({0})")]
    Failed(String),
}

/// Which secret prompt the user must answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaltPrompt {
    /// Create a PIN and confirm it
    FirstTime,
    /// Re-enter the PIN used before
    Returning,
    /// A PIN for this account is already held; nothing to ask
    Known,
}

pub struct PendingLogin {
    keypair: EphemeralKeyPair,
    randomness: String,
    max_epoch: u64,
    nonce: String,
    authorization_url: Url,
}

pub struct ReceivedToken {
    pending: PendingLogin,
    jwt: String,
    claims: IdentityClaims,
}

pub struct SaltRequired {
    token: ReceivedToken,
    prompt: SaltPrompt,
}

pub struct ProofPending {
    token: ReceivedToken,
    secret: UserSecret,
    address_seed: String,
    request: ProofRequest,
}

pub struct DerivedAccount {
    token: ReceivedToken,
    secret: UserSecret,
    proof: ZkProof,
    address: String,
}

enum LoginState {
    Idle,
    AwaitingRedirect(PendingLogin),
    CallbackReceived(ReceivedToken),
    SaltRequired(SaltRequired),
    ProofRequested(ProofPending),
    AddressDerived(DerivedAccount),
    Complete,
}

impl LoginState {
    fn name(&self) -> &'static str {
        match self {
            LoginState::Idle => "idle",
            LoginState::AwaitingRedirect(_) => "awaiting redirect",
            LoginState::CallbackReceived(_) => "callback received",
            LoginState::SaltRequired(_) => "waiting for PIN",
            LoginState::ProofRequested(_) => "requesting proof",
            LoginState::AddressDerived(_) => "address derived",
            LoginState::Complete => "complete",
        }
    }
}

pub struct LoginFlow {
    oauth: OAuthConfig,
    max_epoch_offset: u64,
    state: LoginState,
}

impl LoginFlow {
    pub fn new(oauth: OAuthConfig, max_epoch_offset: u64) -> Self {
        Self {
            oauth,
            max_epoch_offset,
            state: LoginState::Idle,
        }
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    pub fn is_connecting(&self) -> bool {
        !matches!(self.state, LoginState::Idle | LoginState::Complete)
    }

    /// Abandon any login in progress.
    pub fn cancel(&mut self) {
        if self.is_connecting() {
            info!("Login cancelled while {}", self.state.name());
        }
        self.state = LoginState::Idle;
    }

    /// Authorization URL of the login in progress, if it is waiting for the redirect.
    pub fn authorization_url(&self) -> Option<&Url> {
        match &self.state {
            LoginState::AwaitingRedirect(pending) => Some(&pending.authorization_url),
            _ => None,
        }
    }

    pub fn salt_prompt(&self) -> Option<SaltPrompt> {
        match &self.state {
            LoginState::SaltRequired(salt) => Some(salt.prompt),
            _ => None,
        }
    }

    fn fail(&mut self, reason: impl std::fmt::Display) -> FlowError {
        error!("Login failed: {}", reason);
        self.state = LoginState::Idle;
        FlowError::Failed(reason.to_string())
    }

    fn invalid(&self, action: &'static str) -> FlowError {
        FlowError::InvalidState {
            action,
            state: self.state.name(),
        }
    }

    /// Fresh ephemeral key, randomness and nonce; returns the provider URL to open.
    pub async fn begin(&mut self, epochs: &dyn EpochSource, origin: &Url) -> Result<Url, FlowError> {
        if self.is_connecting() {
            warn!("Ignoring login request while {}", self.state.name());
            return Err(FlowError::AlreadyInProgress);
        }

        let current_epoch = match epochs.current_epoch().await {
            Ok(epoch) => epoch,
            Err(e) => return Err(self.fail(e)),
        };
        let max_epoch = current_epoch + self.max_epoch_offset;

        let keypair = EphemeralKeyPair::generate();
        let randomness = generate_randomness();
        let nonce = generate_nonce(&keypair, max_epoch, &randomness).map_err(|e| self.fail(e))?;
        let authorization_url = self.oauth.authorization_url(origin, &nonce).map_err(|e| self.fail(e))?;

        info!("Login started, max epoch {}", max_epoch);
        self.state = LoginState::AwaitingRedirect(PendingLogin {
            keypair,
            randomness,
            max_epoch,
            nonce,
            authorization_url: authorization_url.clone(),
        });
        Ok(authorization_url)
    }

    /// Accept the provider redirect. Claims are checked before any prover call.
    pub fn receive_callback(&mut self, redirect: &str) -> Result<(), FlowError> {
        let pending = match std::mem::replace(&mut self.state, LoginState::Idle) {
            LoginState::AwaitingRedirect(pending) => pending,
            other => {
                self.state = other;
                return Err(self.invalid("accept a callback"));
            }
        };

        let jwt = extract_id_token(redirect).ok_or_else(|| self.fail("redirect carries no id_token"))?;
        let claims = identity_claims(&jwt).map_err(|e| self.fail(e))?;

        if claims.nonce.as_deref() != Some(pending.nonce.as_str()) {
            return Err(self.fail("token nonce does not match this login"));
        }

        info!("Identity token accepted");
        self.state = LoginState::CallbackReceived(ReceivedToken { pending, jwt, claims });
        Ok(())
    }

    /// Decide between first-time setup and re-entry for the token's subject.
    /// When `session` holds a PIN bound to this subject the flow moves straight
    /// on to the proof request and `Known` is returned.
    pub fn resolve_prompt(&mut self, registry: &SecretRegistry, session: &SessionStore) -> Result<SaltPrompt, FlowError> {
        let token = match std::mem::replace(&mut self.state, LoginState::Idle) {
            LoginState::CallbackReceived(token) => token,
            other => {
                self.state = other;
                return Err(self.invalid("ask for a PIN"));
            }
        };

        if let Some(secret) = session.user_secret_for(GOOGLE_PROVIDER, &token.claims.sub) {
            info!("Reusing the PIN held for this account");
            self.prepare_proof(token, secret.clone())?;
            return Ok(SaltPrompt::Known);
        }

        let prompt = if registry.is_registered(GOOGLE_PROVIDER, &token.claims.sub) {
            SaltPrompt::Returning
        } else {
            SaltPrompt::FirstTime
        };
        self.state = LoginState::SaltRequired(SaltRequired { token, prompt });
        Ok(prompt)
    }

    /// Check the PIN against the prompt and prepare the prover request.
    pub fn submit_secret(&mut self, entry: &str, confirmation: Option<&str>) -> Result<(), FlowError> {
        let salt = match std::mem::replace(&mut self.state, LoginState::Idle) {
            LoginState::SaltRequired(salt) => salt,
            other => {
                self.state = other;
                return Err(self.invalid("submit a PIN"));
            }
        };

        let checked = match salt.prompt {
            SaltPrompt::FirstTime => match confirmation {
                Some(confirmation) => UserSecret::confirm(entry, confirmation),
                None => Err(ZkLoginError::InvalidSecret("please confirm your PIN".to_string())),
            },
            SaltPrompt::Returning | SaltPrompt::Known => UserSecret::new(entry),
        };

        let secret = match checked {
            Ok(secret) => secret,
            Err(e) => {
                self.state = LoginState::SaltRequired(salt);
                return Err(FlowError::Validation(e.to_string()));
            }
        };

        self.prepare_proof(salt.token, secret)
    }

    fn prepare_proof(&mut self, token: ReceivedToken, secret: UserSecret) -> Result<(), FlowError> {
        let seed = address_seed(&secret, &token.claims.sub, &token.claims.aud).map_err(|e| self.fail(e))?;
        let request = ProofRequest {
            jwt: token.jwt.clone(),
            extended_ephemeral_public_key: token.pending.keypair.extended_public_key(),
            jwt_randomness: token.pending.randomness.clone(),
            max_epoch: token.pending.max_epoch.to_string(),
            key_claim_name: KEY_CLAIM_NAME.to_string(),
            key_claim_value: token.claims.sub.clone(),
            salt: secret.expose().to_string(),
        };

        self.state = LoginState::ProofRequested(ProofPending {
            token,
            secret,
            address_seed: seed,
            request,
        });
        Ok(())
    }

    /// Obtain the proof and derive the account address. Returns the address.
    pub async fn request_proof(&mut self, prover: &dyn Prover) -> Result<String, FlowError> {
        let pending = match std::mem::replace(&mut self.state, LoginState::Idle) {
            LoginState::ProofRequested(pending) => pending,
            other => {
                self.state = other;
                return Err(self.invalid("request a proof"));
            }
        };

        info!("Requesting proof from {} prover", prover.name());
        let proof = match prover.prove(&pending.request, &pending.address_seed).await {
            Ok(proof) => proof,
            Err(e) => return Err(self.fail(e)),
        };

        let iss = pending.token.claims.iss.as_deref().unwrap_or(DEFAULT_ISSUER);
        let address = derive_address(&pending.address_seed, iss)
            .map(|bytes| format_address(&bytes))
            .map_err(|e| self.fail(e))?;

        info!("Derived zkLogin address {}", address);
        self.state = LoginState::AddressDerived(DerivedAccount {
            token: pending.token,
            secret: pending.secret,
            proof,
            address: address.clone(),
        });
        Ok(address)
    }

    /// Commit the session, the secret flag and the identity, then return to idle.
    pub fn complete(
        &mut self,
        session: &mut SessionStore,
        auth: &mut AuthContext,
        registry: &SecretRegistry,
    ) -> Result<UserIdentity, FlowError> {
        let derived = match std::mem::replace(&mut self.state, LoginState::Idle) {
            LoginState::AddressDerived(derived) => derived,
            other => {
                self.state = other;
                return Err(self.invalid("complete a login"));
            }
        };

        let ephemeral_key = derived.token.pending.keypair.to_sui_private_key().map_err(|e| self.fail(e))?;
        let claims = derived.token.claims;

        if let Some(previous) = auth.persisted_for(GOOGLE_PROVIDER, &claims.sub) {
            if previous.address != derived.address {
                warn!(
                    "Derived address {} differs from previously used {}; a different PIN was entered",
                    derived.address, previous.address
                );
            }
        }

        session.set(Session {
            ephemeral_key,
            proof: derived.proof,
            max_epoch: derived.token.pending.max_epoch,
            user_secret: Some(derived.secret),
        });
        session.bind_user_secret(GOOGLE_PROVIDER, &claims.sub);
        registry.mark_registered(GOOGLE_PROVIDER, &claims.sub);

        let identity = UserIdentity {
            address: derived.address,
            provider: GOOGLE_PROVIDER.to_string(),
            sub: claims.sub,
            email: claims.email,
            name: claims.name,
        };
        auth.login(identity.clone());

        self.state = LoginState::Complete;
        Ok(identity)
    }
}
