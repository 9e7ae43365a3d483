use crate::error::{Result, ZkLoginError};
use crate::secret::UserSecret;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use num_bigint::BigUint;

type Blake2b256 = Blake2b<U32>;

/// Signature scheme flag for zkLogin authenticators and addresses
pub const ZKLOGIN_FLAG: u8 = 0x05;

/// Claim the address is bound to
pub const KEY_CLAIM_NAME: &str = "sub";

const GOOGLE_ISS_SHORT: &str = "accounts.google.com";
const GOOGLE_ISS: &str = "https://accounts.google.com";

/// Poseidon address seed over (salt, claim name, claim value, audience).
/// Same inputs always give the same seed; a different secret gives a
/// different seed and so a different account.
pub fn address_seed(secret: &UserSecret, sub: &str, aud: &str) -> Result<String> {
    fastcrypto_zkp::bn254::utils::gen_address_seed(secret.expose(), KEY_CLAIM_NAME, sub, aud)
        .map_err(|e| ZkLoginError::Derivation(format!("Failed to compute address seed: {}", e)))
}

/// zkLogin address: blake2b256(flag || len(iss) || iss || seed as 32 bytes BE)
pub fn derive_address(address_seed: &str, iss: &str) -> Result<[u8; 32]> {
    let seed = BigUint::parse_bytes(address_seed.as_bytes(), 10)
        .ok_or_else(|| ZkLoginError::Derivation("Address seed is not a decimal integer".to_string()))?;
    let seed_bytes = seed.to_bytes_be();
    if seed_bytes.len() > 32 {
        return Err(ZkLoginError::Derivation("Address seed exceeds 32 bytes".to_string()));
    }
    let mut padded = [0u8; 32];
    padded[32 - seed_bytes.len()..].copy_from_slice(&seed_bytes);

    let iss = normalize_iss(iss);
    let iss_len = u8::try_from(iss.len())
        .map_err(|_| ZkLoginError::Derivation("Issuer is too long".to_string()))?;

    let mut hasher = Blake2b256::new();
    hasher.update([ZKLOGIN_FLAG]);
    hasher.update([iss_len]);
    hasher.update(iss.as_bytes());
    hasher.update(padded);
    let digest = hasher.finalize();

    let mut addr_bytes = [0u8; 32];
    addr_bytes.copy_from_slice(&digest);
    Ok(addr_bytes)
}

pub fn format_address(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

// Google issues both forms; the chain only knows the https one
fn normalize_iss(iss: &str) -> &str {
    if iss == GOOGLE_ISS_SHORT { GOOGLE_ISS } else { iss }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUB: &str = "110463452167303598383";
    const AUD: &str = "25769832374-famecqrhe2gkebt5fvqms2263046lj96.apps.googleusercontent.com";

    #[test]
    fn test_address_seed_is_deterministic() {
        let secret = UserSecret::new("123456").unwrap();
        let first = address_seed(&secret, SUB, AUD).unwrap();
        let second = address_seed(&secret, SUB, AUD).unwrap();
        assert_eq!(first, second);
        assert!(first.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_same_secret_same_address() {
        let first = address_seed(&UserSecret::new("123456").unwrap(), SUB, AUD).unwrap();
        let again = address_seed(&UserSecret::new("123456").unwrap(), SUB, AUD).unwrap();
        assert_eq!(
            derive_address(&first, GOOGLE_ISS).unwrap(),
            derive_address(&again, GOOGLE_ISS).unwrap()
        );
    }

    #[test]
    fn test_different_secret_different_address() {
        let first = address_seed(&UserSecret::new("123456").unwrap(), SUB, AUD).unwrap();
        let other = address_seed(&UserSecret::new("654321").unwrap(), SUB, AUD).unwrap();
        assert_ne!(first, other);
        assert_ne!(
            derive_address(&first, GOOGLE_ISS).unwrap(),
            derive_address(&other, GOOGLE_ISS).unwrap()
        );
    }

    #[test]
    fn test_short_google_issuer_is_normalized() {
        let seed = "12345678901234567890";
        assert_eq!(
            derive_address(seed, GOOGLE_ISS_SHORT).unwrap(),
            derive_address(seed, GOOGLE_ISS).unwrap()
        );
        assert_ne!(
            derive_address(seed, GOOGLE_ISS).unwrap(),
            derive_address(seed, "https://id.twitch.tv/oauth2").unwrap()
        );
    }

    #[test]
    fn test_rejects_non_decimal_seed() {
        assert!(derive_address("0xabc", GOOGLE_ISS).is_err());
        let too_big = "9".repeat(80);
        assert!(derive_address(&too_big, GOOGLE_ISS).is_err());
    }

    #[test]
    fn test_format_address() {
        let formatted = format_address(&[0xab; 32]);
        assert_eq!(formatted.len(), 66);
        assert!(formatted.starts_with("0xabab"));
    }
}
