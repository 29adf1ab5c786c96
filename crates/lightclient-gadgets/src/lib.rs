//! # Light Client Gadgets
//!
//! This crate provides the R1CS gadgets the light client circuits are assembled from. Circuits
//! are defined over BW6-761's scalar field, which is BLS12-377's base field, so G1/G2
//! arithmetic and pairings of BLS12-377 are native.

mod bls;
pub use bls::BlsVerifyGadget;

mod bitmap;
pub use bitmap::Bitmap;

mod hint;
pub use hint::SqrtHintGadget;

mod mimc;
pub use mimc::MimcGadget;

mod hash_to_group;
pub use hash_to_group::{sgn0, HashToGroupGadget};

mod merkle;
pub use merkle::{ExistenceProofVar, InnerNodeVar, MembershipGadget};

/// Helpers shared by the circuits
pub mod utils;
