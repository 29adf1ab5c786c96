//! # Light Client SNARK
//!
//! Proves that an untrusted validator-set commit is a valid continuation of a trusted one, and
//! that key/value pairs are members of a Merkle-committed state tree.
//!
//! The transition circuit recomputes the commitment of both validator sets, maps the signed vote
//! onto BLS12-377's G2 and checks the aggregate BLS signature of each set. Proofs are Groth16
//! over BW6-761, whose scalar field is BLS12-377's base field.

mod api;
pub use api::*;

/// Validator sets, commits and votes
pub mod commit;

/// Fixed-width encodings of roots, field elements and proofs
pub mod encoding;

/// The circuits
pub mod gadgets;

/// Native ICS23-style membership proofs
pub mod ics23;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

/// The curve the BLS signatures live on
pub type BLSCurve = ark_bls12_377::Bls12_377;
/// G1 of the BLS curve, public keys
pub type BLSCurveG1 = ark_bls12_377::G1Affine;
/// G2 of the BLS curve, signatures and hashed messages
pub type BLSCurveG2 = ark_bls12_377::G2Affine;
/// The curve the proofs are produced on
pub type BWCurve = ark_bw6_761::BW6_761;
/// The circuits' field, BW6-761's scalar field
pub type BWField = ark_bw6_761::Fr;
/// The field the state tree is hashed over, BLS12-377's scalar field
pub type StateField = ark_bls12_377::Fr;
