//! Hashing arbitrary messages onto G2 of BLS12-377.
//!
//! A message is first hashed to two base field elements with a personalized blake2s
//! ([`hash_to_field`]), which form the `Fq2` input `u` of the Shallue-van de Woestijne map
//! ([`MapToCurve`]). The mapped point is then multiplied by the cofactor.
//!
//! ```rust
//! use lightclient_crypto::{SIG_DOMAIN, hash_to_curve::{HashToCurve, g2_map}};
//!
//! // the map constants are computed once per process
//! let hasher = g2_map().unwrap();
//! let hash = HashToCurve::hash(hasher, SIG_DOMAIN, &b"some_data"[..]).expect("should not fail");
//! assert!(hash.is_on_curve());
//! ```
mod hint;
pub use hint::{is_square, SqrtHint};

mod svdw;
pub use svdw::{sgn0, MapToCurve};

use crate::{BLSError, BlsResult, HashError};

use ark_bls12_377::{g2, Fq, Fq2, G2Affine};
use ark_ff::PrimeField;
use once_cell::sync::Lazy;

/// Bytes of hash output reduced into each field element
const BYTES_PER_ELEMENT: usize = 64;

/// Width of a single blake2s output
const BLAKE2S_OUTPUT: usize = 32;

/// Trait for hashing arbitrary data to a group element on an elliptic curve
pub trait HashToCurve {
    /// The type of the curve being used.
    type Output;

    /// Given a domain separator and a message, produces a hash of them which is a curve point.
    fn hash(&self, domain: &[u8], message: &[u8]) -> Result<Self::Output, BLSError>;
}

static G2_MAP: Lazy<Result<MapToCurve<g2::Config>, HashError>> = Lazy::new(MapToCurve::new);

/// The process-wide SvdW map onto BLS12-377's G2
pub fn g2_map() -> BlsResult<&'static MapToCurve<g2::Config>> {
    G2_MAP.as_ref().map_err(|e| BLSError::HashError(e.clone()))
}

/// Hashes `message` to two elements of `Fq`.
///
/// Each element is the reduction of 64 bytes of blake2s output, produced by hashing the message
/// under the `domain` personalization with consecutive node offsets.
pub fn hash_to_field(domain: &[u8], message: &[u8]) -> BlsResult<[Fq; 2]> {
    if domain.len() > 8 {
        return Err(BLSError::DomainTooLarge(domain.len()));
    }

    let chunks_per_element = BYTES_PER_ELEMENT / BLAKE2S_OUTPUT;
    let mut elements = [Fq::from(0u64); 2];
    for (i, element) in elements.iter_mut().enumerate() {
        let mut bytes = Vec::with_capacity(BYTES_PER_ELEMENT);
        for j in 0..chunks_per_element {
            let hash = blake2s_simd::Params::new()
                .hash_length(BLAKE2S_OUTPUT)
                .node_offset((i * chunks_per_element + j) as u64)
                .personal(domain)
                .hash(message);
            bytes.extend_from_slice(hash.as_bytes());
        }
        *element = Fq::from_be_bytes_mod_order(&bytes);
    }

    Ok(elements)
}

/// Hashes `message` onto the prime order subgroup of G2
pub fn hash_to_g2(domain: &[u8], message: &[u8]) -> BlsResult<G2Affine> {
    HashToCurve::hash(g2_map()?, domain, message)
}

impl HashToCurve for MapToCurve<g2::Config> {
    type Output = G2Affine;

    fn hash(&self, domain: &[u8], message: &[u8]) -> BlsResult<G2Affine> {
        let [c0, c1] = hash_to_field(domain, message)?;
        let hash = MapToCurve::<g2::Config>::hash(self, &Fq2::new(c0, c1))?;
        log::trace!("hashed {} message bytes to G2", message.len());
        Ok(hash)
    }
}
