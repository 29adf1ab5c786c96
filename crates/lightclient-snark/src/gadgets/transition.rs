//! # Light Client Transition Circuit
//!
//! Proves that the validator sets committed to by two public roots both signed the public
//! message: the trusted set is the one the verifier already follows, the untrusted set the one it
//! moves to.

use super::ValidatorSetVar;
use crate::commit::TransitionWitness;
use ark_bls12_377::{constraints::Fq2Var, g2, Fq};
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use lightclient_crypto::hashers::digest_limb_elements;
use lightclient_gadgets::HashToGroupGadget;
use tracing::{debug, info, span, Level};

type G2Hasher = HashToGroupGadget<g2::Config, Fq, Fq2Var>;

/// The transition circuit. Its public inputs are, in order, the `(hi, lo)` limbs of the trusted
/// root, the limbs of the untrusted root and the two elements of the message.
#[derive(Clone, Debug)]
pub struct TransitionCircuit {
    pub witness: TransitionWitness,
}

impl TransitionCircuit {
    pub fn new(witness: TransitionWitness) -> Self {
        Self { witness }
    }

    /// A circuit over empty validator sets of the given capacity, used when running the setup
    pub fn empty(capacity: usize) -> Self {
        Self::new(TransitionWitness::empty(capacity))
    }
}

impl ConstraintSynthesizer<Fq> for TransitionCircuit {
    #[tracing::instrument(target = "r1cs", skip_all)]
    fn generate_constraints(self, cs: ConstraintSystemRef<Fq>) -> Result<(), SynthesisError> {
        let span = span!(Level::TRACE, "TransitionCircuit");
        let _enter = span.enter();
        info!("generating constraints");

        let witness = &self.witness;
        let (trusted_hi, trusted_lo) = digest_limb_elements::<Fq>(&witness.trusted_root);
        let (untrusted_hi, untrusted_lo) = digest_limb_elements::<Fq>(&witness.untrusted_root);
        let mut inputs = vec![];
        for value in [
            trusted_hi,
            trusted_lo,
            untrusted_hi,
            untrusted_lo,
            witness.message[0],
            witness.message[1],
        ] {
            inputs.push(FpVar::new_input(cs.clone(), || Ok(value))?);
        }

        debug!("hashing the message to G2");
        let message = Fq2Var::new(inputs[4].clone(), inputs[5].clone());
        let message_hash = G2Hasher::enforce_hash_to_g2(&message)?;

        debug!("verifying the trusted commit");
        let trusted = ValidatorSetVar::alloc(cs.clone(), &witness.trusted)?;
        trusted.enforce(&message_hash, &inputs[0], &inputs[1])?;

        debug!("verifying the untrusted commit");
        let untrusted = ValidatorSetVar::alloc(cs, &witness.untrusted)?;
        untrusted.enforce(&message_hash, &inputs[2], &inputs[3])?;

        info!("constraints generated");
        Ok(())
    }
}
