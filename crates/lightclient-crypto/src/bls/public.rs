use super::Signature;
use crate::{hash_to_g2, BLSError, BlsResult};

use ark_bls12_377::{Bls12_377, G1Affine, G1Projective, G2Affine};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_ff::One;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use std::{borrow::Borrow, ops::Neg};

/// A BLS public key on G1
#[derive(Clone, Copy, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct PublicKey(G1Affine);

impl From<G1Affine> for PublicKey {
    fn from(pk: G1Affine) -> PublicKey {
        PublicKey(pk)
    }
}

impl AsRef<G1Affine> for PublicKey {
    fn as_ref(&self) -> &G1Affine {
        &self.0
    }
}

impl PublicKey {
    /// Sums the provided public keys
    pub fn aggregate<P: Borrow<PublicKey>>(public_keys: impl IntoIterator<Item = P>) -> PublicKey {
        public_keys
            .into_iter()
            .map(|pk| G1Projective::from(pk.borrow().0))
            .sum::<G1Projective>()
            .into_affine()
            .into()
    }

    /// Verifies `signature` over `message` hashed under `domain`
    pub fn verify(&self, message: &[u8], domain: &[u8], signature: &Signature) -> BlsResult<()> {
        let hash = hash_to_g2(domain, message)?;
        self.verify_hashed(&hash, signature)
    }

    /// Checks `e(-g1, sig) * e(pk, H(m)) == 1`
    pub fn verify_hashed(&self, hash: &G2Affine, signature: &Signature) -> BlsResult<()> {
        let pairing = Bls12_377::multi_pairing(
            [G1Affine::generator().neg(), self.0],
            [*signature.as_ref(), *hash],
        );
        if pairing.0.is_one() {
            Ok(())
        } else {
            Err(BLSError::VerificationFailed)
        }
    }
}
