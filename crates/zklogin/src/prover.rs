use crate::error::ZkLoginError;
use crate::jwt::decode_claims;
use crate::proof::{IssBase64Details, ProofPoints, ZkProof};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use num_bigint::BigUint;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ProverError {
    #[error("prover returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("prover request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("prover response rejected: {0}")]
    InvalidResponse(#[from] ZkLoginError),
}

/// Body posted to the proving service.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub jwt: String,
    pub extended_ephemeral_public_key: String,
    pub jwt_randomness: String,
    pub max_epoch: String,
    pub key_claim_name: String,
    pub key_claim_value: String,
    pub salt: String,
}

impl fmt::Debug for ProofRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProofRequest")
            .field("extended_ephemeral_public_key", &self.extended_ephemeral_public_key)
            .field("max_epoch", &self.max_epoch)
            .field("key_claim_name", &self.key_claim_name)
            .field("key_claim_value", &self.key_claim_value)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Prover: Send + Sync {
    async fn prove(&self, request: &ProofRequest, address_seed: &str) -> Result<ZkProof, ProverError>;

    fn name(&self) -> &str;
}

/// Remote proving service reached over HTTP.
pub struct HttpProver {
    client: reqwest::Client,
    url: String,
}

impl HttpProver {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Prover for HttpProver {
    async fn prove(&self, request: &ProofRequest, address_seed: &str) -> Result<ZkProof, ProverError> {
        debug!("Requesting zkLogin proof from {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(ProverError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let proof = ZkProof::from_prover_response(&body, address_seed)?;
        info!("Received zkLogin proof");
        Ok(proof)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Stand-in prover producing well-formed but unverifiable proofs.
/// Output is a pure function of the request.
#[derive(Debug, Default, Clone)]
pub struct MockProver;

impl MockProver {
    fn field_element(request: &ProofRequest, label: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(label.as_bytes());
        hasher.update(request.jwt.as_bytes());
        hasher.update(request.extended_ephemeral_public_key.as_bytes());
        hasher.update(request.jwt_randomness.as_bytes());
        hasher.update(request.max_epoch.as_bytes());
        hasher.update(request.salt.as_bytes());
        let digest = hasher.finalize();
        // 31 bytes keeps the value below the BN254 field modulus
        BigUint::from_bytes_be(&digest[..31]).to_string()
    }
}

#[async_trait]
impl Prover for MockProver {
    async fn prove(&self, request: &ProofRequest, address_seed: &str) -> Result<ZkProof, ProverError> {
        let header_base64 = request.jwt.split('.').next().unwrap_or_default().to_string();
        let iss = decode_claims(&request.jwt)?
            .iss
            .unwrap_or_else(|| "https://accounts.google.com".to_string());
        let iss_fragment = format!("\"iss\":\"{}\",", iss);

        let point = |label: &str| Self::field_element(request, label);
        let proof = ZkProof {
            proof_points: ProofPoints {
                a: vec![point("a.x"), point("a.y"), "1".to_string()],
                b: vec![
                    vec![point("b.x0"), point("b.x1")],
                    vec![point("b.y0"), point("b.y1")],
                    vec!["1".to_string(), "0".to_string()],
                ],
                c: vec![point("c.x"), point("c.y"), "1".to_string()],
            },
            iss_base64_details: IssBase64Details {
                value: general_purpose::URL_SAFE_NO_PAD.encode(iss_fragment),
                index_mod_4: 0,
            },
            header_base64,
            address_seed: address_seed.to_string(),
        };
        proof.validate()?;
        Ok(proof)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::encode_test_token;

    fn request() -> ProofRequest {
        ProofRequest {
            jwt: encode_test_token(&serde_json::json!({
                "iss": "https://accounts.google.com",
                "sub": "42",
                "aud": "client"
            })),
            extended_ephemeral_public_key: "12345".to_string(),
            jwt_randomness: "777".to_string(),
            max_epoch: "12".to_string(),
            key_claim_name: "sub".to_string(),
            key_claim_value: "42".to_string(),
            salt: "123456".to_string(),
        }
    }

    #[test]
    fn test_request_uses_camel_case() {
        let json = serde_json::to_value(request()).unwrap();
        assert_eq!(json["extendedEphemeralPublicKey"], "12345");
        assert_eq!(json["jwtRandomness"], "777");
        assert_eq!(json["maxEpoch"], "12");
        assert_eq!(json["keyClaimName"], "sub");
        assert_eq!(json["keyClaimValue"], "42");
    }

    #[test]
    fn test_request_debug_redacts_secrets() {
        let debug = format!("{:?}", request());
        assert!(!debug.contains("123456"));
        assert!(!debug.contains(&request().jwt));
    }

    #[tokio::test]
    async fn test_mock_prover_is_deterministic() {
        let prover = MockProver;
        let first = prover.prove(&request(), "99").await.unwrap();
        let second = prover.prove(&request(), "99").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.address_seed, "99");
        assert_eq!(first.header_base64, request().jwt.split('.').next().unwrap());

        let mut other = request();
        other.jwt_randomness = "778".to_string();
        assert_ne!(prover.prove(&other, "99").await.unwrap().proof_points, first.proof_points);
    }
}
