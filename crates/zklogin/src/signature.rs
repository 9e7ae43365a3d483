use crate::address::ZKLOGIN_FLAG;
use crate::error::{Result, ZkLoginError};
use crate::keypair::SIMPLE_SIGNATURE_LENGTH;
use crate::proof::{IssBase64Details, ProofPoints, ZkProof};
use base64::{Engine as _, engine::general_purpose};
use blake2::{Blake2b, Digest, digest::consts::U32};
use serde::Serialize;

type Blake2b256 = Blake2b<U32>;

/// Intent prefix for transaction data: scope TransactionData, version V0, app Sui
const TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];

#[derive(Serialize)]
struct ZkLoginInputs<'a> {
    proof_points: &'a ProofPoints,
    iss_base64_details: &'a IssBase64Details,
    header_base64: &'a str,
    address_seed: &'a str,
}

#[derive(Serialize)]
struct ZkLoginAuthenticator<'a> {
    inputs: ZkLoginInputs<'a>,
    max_epoch: u64,
    user_signature: &'a [u8],
}

/// Digest an ephemeral key signs for a transaction.
pub fn transaction_intent_digest(tx_bcs: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(TRANSACTION_INTENT);
    hasher.update(tx_bcs);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// Serialized zkLogin authenticator: flag || bcs(inputs, max_epoch, user_signature).
pub fn zklogin_signature(proof: &ZkProof, max_epoch: u64, user_signature: &[u8]) -> Result<Vec<u8>> {
    if user_signature.len() != SIMPLE_SIGNATURE_LENGTH {
        return Err(ZkLoginError::Serialization(format!(
            "expected a {}-byte ephemeral signature, got {}",
            SIMPLE_SIGNATURE_LENGTH,
            user_signature.len()
        )));
    }

    let authenticator = ZkLoginAuthenticator {
        inputs: ZkLoginInputs {
            proof_points: &proof.proof_points,
            iss_base64_details: &proof.iss_base64_details,
            header_base64: &proof.header_base64,
            address_seed: &proof.address_seed,
        },
        max_epoch,
        user_signature,
    };

    let mut bytes = vec![ZKLOGIN_FLAG];
    bytes.extend(bcs::to_bytes(&authenticator)?);
    Ok(bytes)
}

pub fn zklogin_signature_base64(proof: &ZkProof, max_epoch: u64, user_signature: &[u8]) -> Result<String> {
    Ok(general_purpose::STANDARD.encode(zklogin_signature(proof, max_epoch, user_signature)?))
}
