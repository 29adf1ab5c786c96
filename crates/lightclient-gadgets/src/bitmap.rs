use ark_ff::PrimeField;
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::{
    lc,
    r1cs::{LinearCombination, SynthesisError, Variable},
};

pub trait Bitmap<F: PrimeField> {
    /// Enforces that exactly `count` bits of the bitmap are set
    fn enforce_popcount(&self, count: &FpVar<F>) -> Result<(), SynthesisError>;

    /// Enforces that a bit is only set where the corresponding `active` flag is
    fn enforce_within(&self, active: &[Boolean<F>]) -> Result<(), SynthesisError>;
}

impl<F: PrimeField> Bitmap<F> for [Boolean<F>] {
    #[tracing::instrument(target = "r1cs", skip(count))]
    fn enforce_popcount(&self, count: &FpVar<F>) -> Result<(), SynthesisError> {
        // The number of set bits is a linear combination of the bits, so a single
        // constraint ties it to `count`
        let mut occurrences_lc = LinearCombination::zero();
        for bit in self {
            occurrences_lc = occurrences_lc + bit.lc();
        }

        let count_lc = match count {
            FpVar::Var(v) => lc!() + v.variable,
            FpVar::Constant(c) => lc!() + (*c, Variable::One),
        };
        self.cs().or(count.cs()).enforce_constraint(
            occurrences_lc,
            lc!() + (F::one(), Variable::One),
            count_lc,
        )?;

        Ok(())
    }

    #[tracing::instrument(target = "r1cs", skip(active))]
    fn enforce_within(&self, active: &[Boolean<F>]) -> Result<(), SynthesisError> {
        assert_eq!(self.len(), active.len());
        let cs = self.cs().or(active.cs());
        for (bit, active) in self.iter().zip(active) {
            // bit * (1 - active) == 0
            cs.enforce_constraint(
                bit.lc(),
                lc!() + (F::one(), Variable::One) - active.lc(),
                lc!(),
            )?;
        }
        Ok(())
    }
}
