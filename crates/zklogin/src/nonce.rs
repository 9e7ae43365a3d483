use crate::error::{Result, ZkLoginError};
use crate::keypair::EphemeralKeyPair;
use rand::RngCore;
use rand::rngs::OsRng;

/// 128 bits of fresh randomness as a decimal string, below the BN254 modulus.
pub fn generate_randomness() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    u128::from_be_bytes(bytes).to_string()
}

/// Nonce committed into the OAuth request: Poseidon over the flagged ephemeral
/// public key, the epoch bound and the randomness, truncated and base64url encoded.
pub fn generate_nonce(keypair: &EphemeralKeyPair, max_epoch: u64, randomness: &str) -> Result<String> {
    fastcrypto_zkp::bn254::utils::get_nonce(&keypair.sui_public_key_bytes(), max_epoch, randomness)
        .map_err(|e| ZkLoginError::Derivation(format!("Failed to compute nonce: {}", e)))
}
