mod setup;
pub use setup::{
    compile, generate_parameters, membership_setup, trusted_setup, CompiledCircuit, Parameters,
};

mod prover;
pub use prover::{create_proof, prove_membership, prove_transition, ProvingError};

mod verifier;
pub use verifier::{verify, verify_membership, verify_transition, VerificationError};

mod export;
pub use export::{export_verifier_source, stats, CircuitStats};
