use crate::{
    commit::transition_public_inputs,
    encoding::EncodingError,
    gadgets::membership_public_inputs,
    BWCurve, BWField,
};
use ark_bls12_377::Fq;
use ark_groth16::{Groth16, Proof, VerifyingKey};
use ark_relations::r1cs::SynthesisError;
use ark_snark::SNARK;
use lightclient_crypto::hashers::DIGEST_WIDTH;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
/// Error raised while verifying the SNARK proof
pub enum VerificationError {
    #[error("Verification failed")]
    VerificationFailed,
    #[error("Synthesis Error: {0}")]
    SynthesisError(#[from] SynthesisError),
    #[error("Encoding Error: {0}")]
    EncodingError(#[from] EncodingError),
}

/// Checks `proof` against the verifying key and the public inputs
pub fn verify(
    vk: &VerifyingKey<BWCurve>,
    public_inputs: &[BWField],
    proof: &Proof<BWCurve>,
) -> Result<(), VerificationError> {
    let pvk = Groth16::<BWCurve>::process_vk(vk)?;
    if Groth16::<BWCurve>::verify_with_processed_vk(&pvk, public_inputs, proof)? {
        Ok(())
    } else {
        Err(VerificationError::VerificationFailed)
    }
}

/// Given the verifying key of the transition circuit and only the two roots and the message,
/// checks that the validator sets committed to by both roots signed the message
pub fn verify_transition(
    vk: &VerifyingKey<BWCurve>,
    trusted_root: &[u8; DIGEST_WIDTH],
    untrusted_root: &[u8; DIGEST_WIDTH],
    message: &[Fq; 2],
    proof: &Proof<BWCurve>,
) -> Result<(), VerificationError> {
    info!("Verifying transition proof");
    verify(
        vk,
        &transition_public_inputs(trusted_root, untrusted_root, message),
        proof,
    )
}

/// Checks a membership proof of `key` and `value` under `root`. Non-existence proofs are
/// checked with a zero value.
pub fn verify_membership(
    vk: &VerifyingKey<BWCurve>,
    root: &[u8; DIGEST_WIDTH],
    key: &[u8; DIGEST_WIDTH],
    value: &[u8; DIGEST_WIDTH],
    proof: &Proof<BWCurve>,
) -> Result<(), VerificationError> {
    info!("Verifying membership proof");
    verify(vk, &membership_public_inputs(root, key, value), proof)
}
