use super::{PublicKey, Signature};
use crate::{hash_to_g2, BlsResult};

use ark_bls12_377::{Fr, G1Projective, G2Affine, G2Projective};
use ark_ec::{CurveGroup, Group};
use ark_ff::UniformRand;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand::Rng;

#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct PrivateKey {
    sk: Fr,
}

impl From<Fr> for PrivateKey {
    fn from(sk: Fr) -> PrivateKey {
        PrivateKey { sk }
    }
}

impl AsRef<Fr> for PrivateKey {
    fn as_ref(&self) -> &Fr {
        &self.sk
    }
}

impl PrivateKey {
    pub fn generate<R: Rng>(rng: &mut R) -> PrivateKey {
        PrivateKey { sk: Fr::rand(rng) }
    }

    /// Hashes `message` onto G2 under `domain` and signs it
    pub fn sign(&self, message: &[u8], domain: &[u8]) -> BlsResult<Signature> {
        let hash = hash_to_g2(domain, message)?;
        Ok(self.sign_hashed(&hash))
    }

    /// Signs a message which is already hashed onto G2
    pub fn sign_hashed(&self, hash: &G2Affine) -> Signature {
        Signature::from(G2Projective::from(*hash) * self.sk)
    }

    pub fn to_public(&self) -> PublicKey {
        PublicKey::from((G1Projective::generator() * self.sk).into_affine())
    }
}
