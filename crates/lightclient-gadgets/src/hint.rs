use ark_ff::{Field, PrimeField};
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::SynthesisError;
use lightclient_crypto::hash_to_curve::SqrtHint;
use std::marker::PhantomData;

/// Square root hints for field variables.
///
/// The prover supplies `(is_square, root)` for an element `x` out of circuit, and the gadget
/// enforces `root^2 == x` when `is_square` and `root^2 == x * N` otherwise, where `N` is a fixed
/// non-residue. A zero `x` must be claimed a square.
pub struct SqrtHintGadget<F, CF, FV> {
    field_type: PhantomData<F>,
    constraint_field_type: PhantomData<CF>,
    field_var_type: PhantomData<FV>,
}

impl<F, CF, FV> SqrtHintGadget<F, CF, FV>
where
    F: Field,
    CF: PrimeField,
    FV: FieldVar<F, CF>,
{
    /// Allocates the hint for `x` and enforces its check
    #[tracing::instrument(target = "r1cs", skip(hint, x))]
    pub fn propose_and_check(
        hint: &SqrtHint<F>,
        x: &FV,
    ) -> Result<(Boolean<CF>, FV), SynthesisError> {
        let proposal = x.value().map(|x| hint.propose(&x));
        let cs = x.cs();
        let (is_square, root) = if x.is_constant() {
            let (is_square, root) = proposal?;
            (Boolean::constant(is_square), FV::constant(root))
        } else {
            let proposal = proposal.ok();
            (
                Boolean::new_witness(cs.clone(), || {
                    proposal
                        .map(|p| p.0)
                        .ok_or(SynthesisError::AssignmentMissing)
                })?,
                FV::new_witness(cs, || {
                    proposal
                        .map(|p| p.1)
                        .ok_or(SynthesisError::AssignmentMissing)
                })?,
            )
        };

        Self::check(hint, x, &is_square, &root)?;
        Ok((is_square, root))
    }

    /// Enforces the relation between `x` and a proposal
    pub fn check(
        hint: &SqrtHint<F>,
        x: &FV,
        is_square: &Boolean<CF>,
        root: &FV,
    ) -> Result<(), SynthesisError> {
        let target = is_square.select(x, &(x.clone() * hint.non_residue()))?;
        root.square()?.enforce_equal(&target)?;
        is_square
            .or(&x.is_zero()?.not())?
            .enforce_equal(&Boolean::TRUE)
    }
}
