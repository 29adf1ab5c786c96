use crate::{artifacts::ArtifactPaths, quorum::Fraction};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_validators must be a non-zero power of two, got {0}")]
    MaxValidators(usize),
    #[error("max_in_flight must be at least 1")]
    MaxInFlight,
    #[error("{name} quorum {numerator}/{denominator} is not in (0, 1]")]
    Quorum {
        name: &'static str,
        numerator: u64,
        denominator: u64,
    },
    #[error("I/O Error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON Error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Settings of the prover service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    pub artifacts: ArtifactPaths,
    /// Validator slots of each set in the circuit
    pub max_validators: usize,
    /// Proofs generated concurrently, further requests wait
    pub max_in_flight: usize,
    /// Share of the trusted set's power which must have signed
    pub trusted_quorum: Fraction,
    /// Share of the untrusted set's power which must have signed
    pub untrusted_quorum: Fraction,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            artifacts: ArtifactPaths::in_dir("artifacts"),
            max_validators: 128,
            max_in_flight: 1,
            trusted_quorum: Fraction::new(1, 3),
            untrusted_quorum: Fraction::new(2, 3),
        }
    }
}

impl ProverConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.max_validators.is_power_of_two() {
            return Err(ConfigError::MaxValidators(self.max_validators));
        }
        if self.max_in_flight == 0 {
            return Err(ConfigError::MaxInFlight);
        }
        for (name, quorum) in [
            ("trusted", &self.trusted_quorum),
            ("untrusted", &self.untrusted_quorum),
        ] {
            if !quorum.is_valid() {
                return Err(ConfigError::Quorum {
                    name,
                    numerator: quorum.numerator,
                    denominator: quorum.denominator,
                });
            }
        }
        Ok(())
    }
}
