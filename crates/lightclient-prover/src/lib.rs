//! # Light Client Prover
//!
//! Turns raw consensus data into transition proofs. The service loads or generates the circuit
//! artifacts once, then proves and verifies requests concurrently, bounded by an admission
//! gate.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod quorum;
pub mod service;
pub mod types;

pub use artifacts::{ArtifactError, ArtifactPaths, Artifacts};
pub use config::{ConfigError, ProverConfig};
pub use error::Error;
pub use quorum::{Fraction, QuorumError};
pub use service::{MemoryReclaim, NoReclaim, ProverService};
pub use types::{CommitData, ProofData, ProveRequest, ProveResponse, VerifyRequest, VoteData};
