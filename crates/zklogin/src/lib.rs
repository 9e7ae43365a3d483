// Module declarations
pub mod address;
pub mod error;
pub mod jwt;
pub mod keypair;
pub mod nonce;
pub mod oauth;
pub mod proof;
pub mod prover;
pub mod secret;
pub mod signature;

// Re-export commonly used types
pub use address::{address_seed, derive_address, format_address, KEY_CLAIM_NAME, ZKLOGIN_FLAG};
pub use error::{Result, ZkLoginError};
pub use jwt::{decode_claims, identity_claims, IdentityClaims, JwtClaims};
pub use keypair::EphemeralKeyPair;
pub use nonce::{generate_nonce, generate_randomness};
pub use oauth::{extract_id_token, is_local_origin, OAuthConfig};
pub use proof::{IssBase64Details, ProofPoints, ZkProof};
pub use prover::{HttpProver, MockProver, ProofRequest, Prover, ProverError};
pub use secret::UserSecret;
pub use signature::{transaction_intent_digest, zklogin_signature, zklogin_signature_base64};
