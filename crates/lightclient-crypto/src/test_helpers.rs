use crate::{PrivateKey, PublicKey, Signature};

use ark_bls12_377::G2Affine;
use ark_ec::CurveGroup;
use std::ops::Add;

// Same RNG for all tests
pub fn rng() -> rand::rngs::ThreadRng {
    rand::thread_rng()
}

/// generate a keypair
pub fn keygen() -> (PrivateKey, PublicKey) {
    let secret_key = PrivateKey::generate(&mut rng());
    let public_key = secret_key.to_public();
    (secret_key, public_key)
}

/// generate N keypairs
pub fn keygen_mul(num: usize) -> (Vec<PrivateKey>, Vec<PublicKey>) {
    (0..num).map(|_| keygen()).unzip()
}

/// sum the elements in the provided slice
pub fn sum<P: CurveGroup>(elements: &[P]) -> P {
    elements.iter().fold(P::zero(), |acc, el| acc.add(el))
}

// signs a message hash with a vector of secret keys and returns the list of sigs + the agg sig
pub fn sign(message_hash: &G2Affine, secret_keys: &[PrivateKey]) -> (Vec<Signature>, Signature) {
    let sigs = secret_keys
        .iter()
        .map(|key| key.sign_hashed(message_hash))
        .collect::<Vec<_>>();
    let asig = Signature::aggregate(&sigs);
    (sigs, asig)
}
