/// Prover Verifier Generator
///
/// Setup: compiles a circuit to its constraint matrices and runs a circuit specific Groth16
/// setup over BW6-761 for it
use crate::{
    gadgets::{MembershipCircuit, MembershipMode, TransitionCircuit},
    BWCurve, BWField,
};

use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_relations::r1cs::{
    ConstraintMatrices, ConstraintSynthesizer, ConstraintSystem, OptimizationGoal,
    SynthesisError, SynthesisMode,
};
use ark_serialize::{
    CanonicalDeserialize, CanonicalSerialize, Compress, Read, SerializationError, Valid,
    Validate, Write,
};
use ark_snark::SNARK;
use rand::{CryptoRng, RngCore};
use tracing::{info, span, Level};

type Result<T> = std::result::Result<T, SynthesisError>;

/// The constraint matrices of a circuit, as produced by a setup mode synthesis
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledCircuit {
    pub matrices: ConstraintMatrices<BWField>,
}

impl CompiledCircuit {
    pub fn num_instance_variables(&self) -> usize {
        self.matrices.num_instance_variables
    }

    pub fn num_witness_variables(&self) -> usize {
        self.matrices.num_witness_variables
    }

    pub fn num_constraints(&self) -> usize {
        self.matrices.num_constraints
    }

    /// Index of the first constraint `full_assignment` does not satisfy
    pub fn first_unsatisfied(&self, full_assignment: &[BWField]) -> Option<usize> {
        let eval = |row: &[(BWField, usize)]| {
            row.iter()
                .map(|(coeff, index)| full_assignment[*index] * coeff)
                .sum::<BWField>()
        };
        let m = &self.matrices;
        m.a.iter()
            .zip(&m.b)
            .zip(&m.c)
            .position(|((a, b), c)| eval(a) * eval(b) != eval(c))
    }
}

impl CanonicalSerialize for CompiledCircuit {
    fn serialize_with_mode<W: Write>(
        &self,
        mut writer: W,
        compress: Compress,
    ) -> std::result::Result<(), SerializationError> {
        let m = &self.matrices;
        m.num_instance_variables.serialize_with_mode(&mut writer, compress)?;
        m.num_witness_variables.serialize_with_mode(&mut writer, compress)?;
        m.num_constraints.serialize_with_mode(&mut writer, compress)?;
        m.a_num_non_zero.serialize_with_mode(&mut writer, compress)?;
        m.b_num_non_zero.serialize_with_mode(&mut writer, compress)?;
        m.c_num_non_zero.serialize_with_mode(&mut writer, compress)?;
        m.a.serialize_with_mode(&mut writer, compress)?;
        m.b.serialize_with_mode(&mut writer, compress)?;
        m.c.serialize_with_mode(&mut writer, compress)
    }

    fn serialized_size(&self, compress: Compress) -> usize {
        let m = &self.matrices;
        6 * 0usize.serialized_size(compress)
            + m.a.serialized_size(compress)
            + m.b.serialized_size(compress)
            + m.c.serialized_size(compress)
    }
}

impl Valid for CompiledCircuit {
    fn check(&self) -> std::result::Result<(), SerializationError> {
        let m = &self.matrices;
        let num_variables = m.num_instance_variables + m.num_witness_variables;
        for (matrix, non_zero) in [
            (&m.a, m.a_num_non_zero),
            (&m.b, m.b_num_non_zero),
            (&m.c, m.c_num_non_zero),
        ] {
            if matrix.len() != m.num_constraints
                || matrix.iter().map(Vec::len).sum::<usize>() != non_zero
                || matrix
                    .iter()
                    .flatten()
                    .any(|(_, index)| *index >= num_variables)
            {
                return Err(SerializationError::InvalidData);
            }
        }
        Ok(())
    }
}

impl CanonicalDeserialize for CompiledCircuit {
    fn deserialize_with_mode<R: Read>(
        mut reader: R,
        compress: Compress,
        validate: Validate,
    ) -> std::result::Result<Self, SerializationError> {
        let mut count = || usize::deserialize_with_mode(&mut reader, compress, validate);
        let num_instance_variables = count()?;
        let num_witness_variables = count()?;
        let num_constraints = count()?;
        let a_num_non_zero = count()?;
        let b_num_non_zero = count()?;
        let c_num_non_zero = count()?;
        let mut matrix = || Vec::<Vec<(BWField, usize)>>::deserialize_with_mode(&mut reader, compress, validate);
        let a = matrix()?;
        let b = matrix()?;
        let c = matrix()?;

        let circuit = CompiledCircuit {
            matrices: ConstraintMatrices {
                num_instance_variables,
                num_witness_variables,
                num_constraints,
                a_num_non_zero,
                b_num_non_zero,
                c_num_non_zero,
                a,
                b,
                c,
            },
        };
        if let Validate::Yes = validate {
            circuit.check()?;
        }
        Ok(circuit)
    }
}

/// Synthesizes `circuit` in setup mode and returns its constraint matrices
pub fn compile<C: ConstraintSynthesizer<BWField>>(circuit: C) -> Result<CompiledCircuit> {
    let span = span!(Level::TRACE, "compile");
    let _enter = span.enter();

    let cs = ConstraintSystem::new_ref();
    cs.set_optimization_goal(OptimizationGoal::Constraints);
    cs.set_mode(SynthesisMode::Setup);
    circuit.generate_constraints(cs.clone())?;
    cs.finalize();

    let matrices = cs.to_matrices().ok_or(SynthesisError::MissingCS)?;
    info!(
        "compiled {} constraints, {} public and {} private variables",
        matrices.num_constraints, matrices.num_instance_variables, matrices.num_witness_variables
    );
    Ok(CompiledCircuit { matrices })
}

/// The compiled circuit and its Groth16 proving key
#[derive(Clone, Debug, PartialEq)]
pub struct Parameters {
    pub circuit: CompiledCircuit,
    pub proving_key: ProvingKey<BWCurve>,
}

impl Parameters {
    pub fn verifying_key(&self) -> &VerifyingKey<BWCurve> {
        &self.proving_key.vk
    }
}

/// Compiles `circuit` and runs a circuit specific setup for it
pub fn generate_parameters<C, R>(circuit: C, rng: &mut R) -> Result<Parameters>
where
    C: ConstraintSynthesizer<BWField> + Clone,
    R: RngCore + CryptoRng,
{
    let compiled = compile(circuit.clone())?;
    let (proving_key, _) = Groth16::<BWCurve>::circuit_specific_setup(circuit, rng)?;
    if proving_key.vk.gamma_abc_g1.len() != compiled.num_instance_variables() {
        return Err(SynthesisError::MalformedVerifyingKey);
    }
    Ok(Parameters {
        circuit: compiled,
        proving_key,
    })
}

/// Generates the parameters of the transition circuit for validator sets of up to `capacity`
/// validators
pub fn trusted_setup<R: RngCore + CryptoRng>(capacity: usize, rng: &mut R) -> Result<Parameters> {
    info!("Generating parameters for {} validators", capacity);
    let span = span!(Level::TRACE, "trusted_setup");
    let _enter = span.enter();

    generate_parameters(TransitionCircuit::empty(capacity), rng)
}

/// Generates the parameters of the membership circuit of the given mode, for paths of up to
/// `max_depth` nodes
pub fn membership_setup<R: RngCore + CryptoRng>(
    mode: MembershipMode,
    max_depth: usize,
    rng: &mut R,
) -> Result<Parameters> {
    info!(
        "Generating {:?} membership parameters for paths of depth {}",
        mode, max_depth
    );
    let span = span!(Level::TRACE, "membership_setup");
    let _enter = span.enter();

    generate_parameters(MembershipCircuit::empty(mode, max_depth), rng)
}
