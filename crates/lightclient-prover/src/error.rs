use crate::{artifacts::ArtifactError, config::ConfigError, quorum::QuorumError};
use lightclient_snark::{
    commit::CommitError, encoding::EncodingError, ProvingError, VerificationError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("invalid input: {0}")]
    Encoding(#[from] EncodingError),
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("invalid commit: {0}")]
    Commit(#[from] CommitError),
    #[error("no quorum: {0}")]
    Quorum(#[from] QuorumError),
    #[error("error generating proof: {0}")]
    Proving(#[from] ProvingError),
    #[error("error verifying proof: {0}")]
    Verification(#[from] VerificationError),
    #[error("error exporting verifier: {0}")]
    Export(#[from] std::fmt::Error),
    #[error("prover task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("prover is shutting down")]
    Closed(#[from] tokio::sync::AcquireError),
}
