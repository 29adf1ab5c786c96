use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A share of the total voting power, `numerator / denominator`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fraction {
    pub numerator: u64,
    pub denominator: u64,
}

impl Fraction {
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Whether the fraction lies in `(0, 1]`
    pub fn is_valid(&self) -> bool {
        self.numerator > 0 && self.denominator > 0 && self.numerator <= self.denominator
    }

    /// The smallest power strictly above this share of `total`, `floor(total * n / d) + 1`
    pub fn threshold(&self, total: u128) -> Result<u128, QuorumError> {
        if self.denominator == 0 {
            return Err(QuorumError::Overflow);
        }
        total
            .checked_mul(self.numerator as u128)
            .map(|scaled| scaled / self.denominator as u128 + 1)
            .ok_or(QuorumError::Overflow)
    }

    /// Checks that `signed` is strictly more than this share of `total`
    pub fn check(&self, commit: &'static str, signed: u128, total: u128) -> Result<(), QuorumError> {
        let required = self.threshold(total)?;
        if signed < required {
            return Err(QuorumError::Insufficient {
                commit,
                signed,
                required,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuorumError {
    #[error("{commit} commit: signed power {signed} is below the required {required}")]
    Insufficient {
        commit: &'static str,
        signed: u128,
        required: u128,
    },
    #[error("voting power overflow")]
    Overflow,
}
