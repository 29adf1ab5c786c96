use ark_bls12_377::{G2Affine, G2Projective};
use ark_ec::CurveGroup;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use std::borrow::Borrow;

/// A BLS signature on G2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct Signature(G2Affine);

impl From<G2Affine> for Signature {
    fn from(sig: G2Affine) -> Signature {
        Signature(sig)
    }
}

impl From<G2Projective> for Signature {
    fn from(sig: G2Projective) -> Signature {
        Signature(sig.into_affine())
    }
}

impl AsRef<G2Affine> for Signature {
    fn as_ref(&self) -> &G2Affine {
        &self.0
    }
}

impl Signature {
    /// Sums the provided signatures to produce the aggregate signature.
    pub fn aggregate<S: Borrow<Signature>>(signatures: impl IntoIterator<Item = S>) -> Signature {
        signatures
            .into_iter()
            .map(|s| G2Projective::from(s.borrow().0))
            .sum::<G2Projective>()
            .into()
    }
}
