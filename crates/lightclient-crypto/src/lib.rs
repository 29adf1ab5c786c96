//! # Light Client Cryptography
//!
//! Native (out of circuit) primitives shared by the light client circuits and the prover:
//! the MiMC compression hash, the Shallue-van de Woestijne map onto BLS12-377's G2 and BLS
//! signatures with public keys on G1 and signatures on G2.

/// BLS signing
pub(crate) mod bls;
pub use bls::{PrivateKey, PublicKey, Signature};

/// Hashing to curve utilities
pub mod hash_to_curve;
pub use hash_to_curve::{hash_to_field, hash_to_g2, HashToCurve, MapToCurve};

/// Field hashes usable inside arithmetic circuits
pub mod hashers;
pub use hashers::{Mimc, MimcField, MimcParameters};

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

use thiserror::Error;

/// Convenience result alias
pub type BlsResult<T> = std::result::Result<T, BLSError>;

/// Domain separator for signing votes
pub const SIG_DOMAIN: &[u8] = b"LCvote01";

/// Domain separator for the MiMC round constant derivation
pub const MIMC_DOMAIN: &[u8] = b"LCmimc01";

#[derive(Debug, Error)]
/// Error type
pub enum BLSError {
    /// Error
    #[error("signature verification failed")]
    VerificationFailed,
    /// An IO error
    #[error("io error {0}")]
    IoError(#[from] std::io::Error),
    /// Personalization string cannot be larger than 8 bytes
    #[error("domain length is too large: {0}")]
    DomainTooLarge(usize),
    #[error("Could not hash to curve")]
    HashToCurveError,
    #[error("hash parameters: {0}")]
    HashError(#[from] HashError),
    #[error("{0}")]
    SerializationError(#[from] ark_serialize::SerializationError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Configuration errors raised while building the hash parameter tables
pub enum HashError {
    #[error("x^{exponent} is not a permutation of the field (gcd(exponent, p - 1) = {gcd})")]
    UnsupportedExponent { exponent: u64, gcd: u64 },
    #[error("the number of rounds must be positive")]
    NoRounds,
    #[error("no SvdW constant Z found after {0} candidates")]
    NoSvdwConstant(u64),
}
