use crate::error::{Result, ZkLoginError};
use serde::{Deserialize, Serialize};

/// Groth16 proof points as decimal field elements (projective coordinates).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPoints {
    pub a: Vec<String>,
    pub b: Vec<Vec<String>>,
    pub c: Vec<String>,
}

/// Base64 slice of the JWT payload that carries the `iss` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssBase64Details {
    pub value: String,
    pub index_mod_4: u8,
}

/// Proof material returned by the prover, joined with the address seed it
/// was computed for. This is everything the zkLogin authenticator needs
/// besides the epoch bound and the ephemeral signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkProof {
    pub proof_points: ProofPoints,
    pub iss_base64_details: IssBase64Details,
    pub header_base64: String,
    pub address_seed: String,
}

// Wire shape of the prover's answer
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProverResponse {
    proof_points: ProofPoints,
    iss_base64_details: IssBase64Details,
    header_base64: String,
}

impl ZkProof {
    /// Parse and validate a prover response body.
    pub fn from_prover_response(body: &[u8], address_seed: &str) -> Result<Self> {
        let response: ProverResponse = serde_json::from_slice(body)
            .map_err(|e| ZkLoginError::InvalidProof(format!("Malformed prover response: {}", e)))?;

        let proof = Self {
            proof_points: response.proof_points,
            iss_base64_details: response.iss_base64_details,
            header_base64: response.header_base64,
            address_seed: address_seed.to_string(),
        };
        proof.validate()?;
        Ok(proof)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let proof: Self = serde_json::from_str(json)
            .map_err(|e| ZkLoginError::InvalidProof(format!("Malformed proof: {}", e)))?;
        proof.validate()?;
        Ok(proof)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ZkLoginError::Serialization(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let points = &self.proof_points;
        if points.a.len() != 3 || points.c.len() != 3 {
            return Err(ZkLoginError::InvalidProof("G1 points must have 3 coordinates".to_string()));
        }
        if points.b.len() != 3 || points.b.iter().any(|p| p.len() != 2) {
            return Err(ZkLoginError::InvalidProof("G2 point must be 3x2 coordinates".to_string()));
        }

        let all_decimal = points
            .a
            .iter()
            .chain(points.b.iter().flatten())
            .chain(points.c.iter())
            .chain(std::iter::once(&self.address_seed))
            .all(|v| is_decimal(v));
        if !all_decimal {
            return Err(ZkLoginError::InvalidProof("Field elements must be decimal".to_string()));
        }

        if self.header_base64.is_empty() || self.iss_base64_details.value.is_empty() {
            return Err(ZkLoginError::InvalidProof("Missing header or issuer details".to_string()));
        }
        if self.iss_base64_details.index_mod_4 > 3 {
            return Err(ZkLoginError::InvalidProof("indexMod4 out of range".to_string()));
        }
        Ok(())
    }
}

fn is_decimal(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
pub(crate) fn sample_response() -> serde_json::Value {
    serde_json::json!({
        "proofPoints": {
            "a": ["1234", "5678", "1"],
            "b": [["11", "12"], ["13", "14"], ["1", "0"]],
            "c": ["21", "22", "1"]
        },
        "issBase64Details": {
            "value": "wiaXNzIjoiaHR0cHM6Ly9hY2NvdW50cy5nb29nbGUuY29tIiw",
            "indexMod4": 1
        },
        "headerBase64": "eyJhbGciOiJSUzI1NiIsImtpZCI6InRlc3QiLCJ0eXAiOiJKV1QifQ"
    })
}
