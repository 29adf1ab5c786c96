use super::setup::Parameters;
use crate::{
    commit::TransitionWitness,
    gadgets::{MembershipCircuit, TransitionCircuit},
    BWCurve, BWField,
};

use ark_ff::UniformRand;
use ark_groth16::{Groth16, Proof};
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystem, OptimizationGoal, SynthesisError, SynthesisMode,
};
use ark_std::{end_timer, start_timer};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, span, Level};

#[derive(Debug, Error)]
/// Error raised while generating a proof
pub enum ProvingError {
    #[error("the witness does not satisfy constraint {index} of {total}")]
    Unsatisfied { index: usize, total: usize },
    #[error("the assignment has {actual} variables but the compiled circuit has {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("Synthesis Error: {0}")]
    SynthesisError(#[from] SynthesisError),
}

/// Synthesizes the assignment of `circuit`, checks it against the compiled constraint matrices
/// and proves it
pub fn create_proof<C, R>(
    parameters: &Parameters,
    circuit: C,
    rng: &mut R,
) -> Result<Proof<BWCurve>, ProvingError>
where
    C: ConstraintSynthesizer<BWField>,
    R: Rng,
{
    let span = span!(Level::TRACE, "create_proof");
    let _enter = span.enter();

    // The compiled matrices stand in for the ones the synthesis would otherwise build
    let synthesis_time = start_timer!(|| "witness synthesis");
    let cs = ConstraintSystem::new_ref();
    cs.set_optimization_goal(OptimizationGoal::Constraints);
    cs.set_mode(SynthesisMode::Prove {
        construct_matrices: false,
    });
    circuit.generate_constraints(cs.clone())?;
    cs.finalize();
    end_timer!(synthesis_time);

    let full_assignment = {
        let cs = cs.borrow().ok_or(SynthesisError::MissingCS)?;
        [
            cs.instance_assignment.as_slice(),
            cs.witness_assignment.as_slice(),
        ]
        .concat()
    };

    let compiled = &parameters.circuit;
    let expected = compiled.num_instance_variables() + compiled.num_witness_variables();
    if full_assignment.len() != expected {
        return Err(ProvingError::ShapeMismatch {
            expected,
            actual: full_assignment.len(),
        });
    }
    if let Some(index) = compiled.first_unsatisfied(&full_assignment) {
        debug!("unsatisfied constraint {}", index);
        return Err(ProvingError::Unsatisfied {
            index,
            total: compiled.num_constraints(),
        });
    }

    let proving_time = start_timer!(|| "groth16 proving");
    let r = BWField::rand(rng);
    let s = BWField::rand(rng);
    let proof = Groth16::<BWCurve>::create_proof_with_reduction_and_matrices(
        &parameters.proving_key,
        r,
        s,
        &compiled.matrices,
        compiled.num_instance_variables(),
        compiled.num_constraints(),
        &full_assignment,
    )?;
    end_timer!(proving_time);

    Ok(proof)
}

/// Proves the transition described by `witness`
pub fn prove_transition<R: Rng>(
    parameters: &Parameters,
    witness: TransitionWitness,
    rng: &mut R,
) -> Result<Proof<BWCurve>, ProvingError> {
    info!(
        "Generating proof for {} trusted and {} untrusted validators",
        witness.trusted.num_validators, witness.untrusted.num_validators,
    );
    let proof = create_proof(parameters, TransitionCircuit::new(witness), rng)?;
    info!("proved");
    Ok(proof)
}

/// Proves a membership statement
pub fn prove_membership<R: Rng>(
    parameters: &Parameters,
    circuit: MembershipCircuit,
    rng: &mut R,
) -> Result<Proof<BWCurve>, ProvingError> {
    info!("Generating {:?} proof", circuit.statement.mode());
    let proof = create_proof(parameters, circuit, rng)?;
    info!("proved");
    Ok(proof)
}
