use crate::error::{Result, ZkLoginError};
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Deserializer};

/// Claims read from an OpenID identity token. The signature is not checked
/// here; the prover and the chain validate the token against the provider JWKS.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JwtClaims {
    pub iss: Option<String>,
    pub sub: Option<String>,
    #[serde(default, deserialize_with = "deserialize_audience")]
    pub aud: Option<String>,
    pub nonce: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub exp: Option<u64>,
    pub iat: Option<u64>,
}

/// Claims the login flow cannot proceed without, plus the profile extras.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub iss: Option<String>,
    pub sub: String,
    pub aud: String,
    pub nonce: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

fn deserialize_audience<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let aud = Option::<Audience>::deserialize(deserializer)?;
    Ok(aud.and_then(|a| match a {
        Audience::One(s) => Some(s),
        Audience::Many(v) => v.into_iter().next(),
    }))
}

/// Decode the payload segment of a compact JWT.
pub fn decode_claims(token: &str) -> Result<JwtClaims> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ZkLoginError::InvalidToken("Invalid JWT format".to_string()));
    }

    // URL_SAFE_NO_PAD handles missing padding
    let decoded = general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| ZkLoginError::InvalidToken(format!("Failed to decode base64: {}", e)))?;

    serde_json::from_slice(&decoded)
        .map_err(|e| ZkLoginError::InvalidToken(format!("Failed to parse JSON: {}", e)))
}

/// Decode and require `sub` and `aud`.
pub fn identity_claims(token: &str) -> Result<IdentityClaims> {
    let claims = decode_claims(token)?;
    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

    match (non_empty(claims.sub), non_empty(claims.aud)) {
        (Some(sub), Some(aud)) => Ok(IdentityClaims {
            iss: non_empty(claims.iss),
            sub,
            aud,
            nonce: claims.nonce,
            email: non_empty(claims.email),
            name: non_empty(claims.name),
        }),
        _ => Err(ZkLoginError::InvalidToken(
            "missing required fields (sub, aud)".to_string(),
        )),
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(payload: &serde_json::Value) -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","kid":"test","typ":"JWT"}"#);
    let body = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.signature", header, body)
}
