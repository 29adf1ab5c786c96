//! MiMC in Miyaguchi-Preneel mode.
//!
//! The block cipher `E_h(m)` runs `x <- (x + h + c_i)^e` over the round constants starting from
//! `x = m` and adds the key once more at the end. Every absorbed element updates the state as
//! `h <- h + E_h(m) + m`.
use crate::{HashError, MIMC_DOMAIN};

use ark_bls12_377::{Fq, Fr};
use ark_ff::{PrimeField, Zero};
use byteorder::{LittleEndian, WriteBytesExt};
use num_bigint::BigUint;
use once_cell::sync::Lazy;

/// Seed the round constants are derived from
const MIMC_SEED: &[u8] = b"light client mimc round constants";

/// Fields which have a published MiMC instantiation
pub trait MimcField: PrimeField {
    /// The process-wide parameter table for this field. Errors when the field's parameters
    /// are not a valid instantiation.
    fn mimc_parameters() -> Result<&'static MimcParameters<Self>, HashError>;
}

static BLS12_377_FR_MIMC: Lazy<Result<MimcParameters<Fr>, HashError>> =
    Lazy::new(|| MimcParameters::new(17, 62, MIMC_SEED));

static BLS12_377_FQ_MIMC: Lazy<Result<MimcParameters<Fq>, HashError>> =
    Lazy::new(|| MimcParameters::new(5, 163, MIMC_SEED));

impl MimcField for Fr {
    fn mimc_parameters() -> Result<&'static MimcParameters<Self>, HashError> {
        BLS12_377_FR_MIMC.as_ref().map_err(Clone::clone)
    }
}

// BW6-761's scalar field, i.e. the native field of the light client circuits
impl MimcField for Fq {
    fn mimc_parameters() -> Result<&'static MimcParameters<Self>, HashError> {
        BLS12_377_FQ_MIMC.as_ref().map_err(Clone::clone)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// The exponent of the power map and the round constants
pub struct MimcParameters<F> {
    exponent: u64,
    constants: Vec<F>,
}

impl<F: PrimeField> MimcParameters<F> {
    /// Builds the parameters, deriving `rounds` constants from `seed` with a blake2s chain.
    ///
    /// Fails if `x^exponent` does not permute the field.
    pub fn new(exponent: u64, rounds: usize, seed: &[u8]) -> Result<Self, HashError> {
        if rounds == 0 {
            return Err(HashError::NoRounds);
        }

        let modulus: BigUint = F::MODULUS.into();
        let remainder = (modulus - 1u32) % BigUint::from(exponent);
        let remainder = remainder.to_u64_digits().first().copied().unwrap_or(0);
        let gcd = gcd(exponent, remainder);
        if exponent < 3 || gcd != 1 {
            return Err(HashError::UnsupportedExponent { exponent, gcd });
        }

        let mut constants = Vec::with_capacity(rounds);
        let mut state = blake2s_simd::Params::new()
            .hash_length(32)
            .personal(MIMC_DOMAIN)
            .hash(seed);
        for round in 0..rounds {
            let mut input = state.as_bytes().to_vec();
            // writing to a Vec cannot fail
            let _ = input.write_u32::<LittleEndian>(round as u32);
            state = blake2s_simd::Params::new()
                .hash_length(32)
                .personal(MIMC_DOMAIN)
                .hash(&input);
            constants.push(F::from_be_bytes_mod_order(state.as_bytes()));
        }
        log::trace!(
            "mimc parameters: exponent {}, {} rounds",
            exponent,
            constants.len()
        );

        Ok(MimcParameters {
            exponent,
            constants,
        })
    }

    /// The exponent `e` of the power map
    pub fn exponent(&self) -> u64 {
        self.exponent
    }

    /// The round constants
    pub fn constants(&self) -> &[F] {
        &self.constants
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

#[derive(Clone, Debug)]
/// Native MiMC hasher. Elements are buffered by `write` and absorbed by `sum`.
pub struct Mimc<F: 'static> {
    params: &'static MimcParameters<F>,
    h: F,
    data: Vec<F>,
}

impl<F: MimcField> Mimc<F> {
    pub fn new() -> Result<Self, HashError> {
        Ok(Mimc {
            params: F::mimc_parameters()?,
            h: F::zero(),
            data: Vec::new(),
        })
    }

    /// Hashes `elements` with a fresh state
    pub fn hash(elements: &[F]) -> Result<F, HashError> {
        let mut hasher = Self::new()?;
        hasher.write(elements);
        Ok(hasher.sum())
    }

    /// Appends elements to the pending input without hashing them
    pub fn write(&mut self, elements: &[F]) {
        self.data.extend_from_slice(elements);
    }

    /// Absorbs the pending input and returns the running digest
    pub fn sum(&mut self) -> F {
        for m in std::mem::take(&mut self.data) {
            let r = self.encrypt(m);
            self.h += r + m;
        }
        self.h
    }

    /// Drops the pending input and resets the state to zero
    pub fn reset(&mut self) {
        self.data.clear();
        self.h = F::zero();
    }

    fn encrypt(&self, m: F) -> F {
        let exponent = [self.params.exponent];
        let mut x = m;
        for c in self.params.constants() {
            x = (x + self.h + c).pow(exponent);
        }
        x + self.h
    }
}
