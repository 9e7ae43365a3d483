use crate::error::{Result, ZkLoginError};
use ed25519_dalek::{Signature, Signer, SigningKey};
use num_bigint::BigUint;
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;
use zeroize::Zeroizing;

/// Signature scheme flag for ed25519 in Sui serialized keys and signatures
pub const ED25519_FLAG: u8 = 0x00;

const SUI_PRIVATE_KEY_HRP: &str = "suiprivkey";

/// Length of a serialized Sui ed25519 signature: flag || signature || public key
pub const SIMPLE_SIGNATURE_LENGTH: usize = 1 + 64 + 32;

/// Short-lived ed25519 key pair bound to one zkLogin session.
pub struct EphemeralKeyPair {
    signing_key: SigningKey,
}

impl EphemeralKeyPair {
    pub fn generate() -> Self {
        let mut sk_bytes = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut *sk_bytes);
        Self {
            signing_key: SigningKey::from_bytes(&sk_bytes),
        }
    }

    pub fn from_secret_bytes(secret_key: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret_key),
        }
    }

    /// Restore a key pair from its bech32 `suiprivkey` encoding.
    pub fn from_sui_private_key(encoded: &str) -> Result<Self> {
        let (hrp, data, _variant) = bech32::decode(encoded)
            .map_err(|e| ZkLoginError::InvalidKey(format!("Failed to decode private key: {}", e)))?;

        if hrp != SUI_PRIVATE_KEY_HRP {
            return Err(ZkLoginError::InvalidKey("Invalid private key format".to_string()));
        }

        let key_bytes: Zeroizing<Vec<u8>> = Zeroizing::new(
            bech32::FromBase32::from_base32(&data)
                .map_err(|e| ZkLoginError::InvalidKey(format!("Failed to convert private key: {}", e)))?,
        );

        // The format is [flag || 32-byte secret]
        if key_bytes.len() != 33 || key_bytes[0] != ED25519_FLAG {
            return Err(ZkLoginError::InvalidKey("Invalid Ed25519 private key".to_string()));
        }

        let mut secret_key = Zeroizing::new([0u8; 32]);
        secret_key.copy_from_slice(&key_bytes[1..33]);
        Ok(Self::from_secret_bytes(&secret_key))
    }

    /// bech32 `suiprivkey` encoding of [flag || 32-byte secret]
    pub fn to_sui_private_key(&self) -> Result<String> {
        let mut payload = Zeroizing::new(Vec::with_capacity(33));
        payload.push(ED25519_FLAG);
        payload.extend_from_slice(self.signing_key.as_bytes());
        bech32::encode(
            SUI_PRIVATE_KEY_HRP,
            bech32::ToBase32::to_base32(&*payload),
            bech32::Variant::Bech32,
        )
        .map_err(|e| ZkLoginError::InvalidKey(format!("Failed to encode bech32 private key: {}", e)))
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Public key prefixed with the scheme flag, as hashed into the nonce.
    pub fn sui_public_key_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(33);
        bytes.push(ED25519_FLAG);
        bytes.extend_from_slice(&self.public_key_bytes());
        bytes
    }

    /// Decimal big-endian integer of the flagged public key, the form the prover expects.
    pub fn extended_public_key(&self) -> String {
        BigUint::from_bytes_be(&self.sui_public_key_bytes()).to_string()
    }

    /// Sign `message` and return the Sui serialized signature [flag || sig || pubkey].
    pub fn sign_simple(&self, message: &[u8]) -> Vec<u8> {
        let sig: Signature = self.signing_key.sign(message);

        let mut sui_sig = Vec::with_capacity(SIMPLE_SIGNATURE_LENGTH);
        sui_sig.push(ED25519_FLAG);
        sui_sig.extend_from_slice(&sig.to_bytes());
        sui_sig.extend_from_slice(&self.public_key_bytes());
        sui_sig
    }

    /// Sign BCS transaction data under the transaction intent.
    pub fn sign_transaction(&self, tx_bcs: &[u8]) -> Vec<u8> {
        let digest = crate::signature::transaction_intent_digest(tx_bcs);
        self.sign_simple(&digest)
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Verifier, VerifyingKey};

    #[test]
    fn test_sui_private_key_round_trip() {
        let keypair = EphemeralKeyPair::generate();
        let encoded = keypair.to_sui_private_key().unwrap();
        assert!(encoded.starts_with("suiprivkey1"));

        let restored = EphemeralKeyPair::from_sui_private_key(&encoded).unwrap();
        assert_eq!(restored.public_key_bytes(), keypair.public_key_bytes());
    }

    #[test]
    fn test_rejects_foreign_hrp() {
        let data = bech32::ToBase32::to_base32(&[0u8; 33]);
        let encoded = bech32::encode("notsui", data, bech32::Variant::Bech32).unwrap();
        assert!(EphemeralKeyPair::from_sui_private_key(&encoded).is_err());
        assert!(EphemeralKeyPair::from_sui_private_key("garbage").is_err());
    }

    #[test]
    fn test_simple_signature_layout() {
        let keypair = EphemeralKeyPair::from_secret_bytes(&[7u8; 32]);
        let sig = keypair.sign_simple(b"hello");
        assert_eq!(sig.len(), SIMPLE_SIGNATURE_LENGTH);
        assert_eq!(sig[0], ED25519_FLAG);
        assert_eq!(&sig[65..], &keypair.public_key_bytes()[..]);

        let vk = VerifyingKey::from_bytes(&keypair.public_key_bytes()).unwrap();
        let sig_bytes: [u8; 64] = sig[1..65].try_into().unwrap();
        assert!(vk.verify(b"hello", &Signature::from_bytes(&sig_bytes)).is_ok());
    }

    #[test]
    fn test_extended_public_key_is_decimal_of_flagged_key() {
        let keypair = EphemeralKeyPair::from_secret_bytes(&[1u8; 32]);
        let extended = keypair.extended_public_key();
        assert!(extended.chars().all(|c| c.is_ascii_digit()));
        let parsed = BigUint::parse_bytes(extended.as_bytes(), 10).unwrap();
        // Leading zero flag byte disappears in the integer form
        let bytes = parsed.to_bytes_be();
        let mut padded = vec![0u8; 32 - bytes.len()];
        padded.extend_from_slice(&bytes);
        assert_eq!(padded, keypair.public_key_bytes().to_vec());
    }

    #[test]
    fn test_debug_hides_secret() {
        let keypair = EphemeralKeyPair::from_secret_bytes(&[9u8; 32]);
        let debug = format!("{:?}", keypair);
        assert!(debug.contains("public_key"));
        assert!(!debug.contains(&hex::encode([9u8; 32])));
    }
}
