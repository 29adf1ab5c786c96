use crate::commit::LightClientInput;
use ark_bls12_377::{
    constraints::{G1Var, G2Var, PairingVar},
    Bls12_377, Fq, G2Projective,
};
use ark_r1cs_std::{
    alloc::AllocationMode, fields::fp::FpVar, groups::curves::short_weierstrass::ProjectiveVar,
    prelude::*,
};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use lightclient_gadgets::{
    utils::{active_slots, enforce_digest},
    Bitmap, BlsVerifyGadget, MimcGadget,
};
use tracing::{debug, span, Level};

type BlsGadget = BlsVerifyGadget<Bls12_377, Fq, PairingVar>;
type Hasher = MimcGadget<Fq, Fq, FpVar<Fq>>;

/// A commit allocated in the constraint system
pub struct ValidatorSetVar {
    pub xs: Vec<FpVar<Fq>>,
    pub ys: Vec<FpVar<Fq>>,
    pub public_keys: Vec<G1Var>,
    pub voting_powers: Vec<FpVar<Fq>>,
    pub num_validators: FpVar<Fq>,
    pub bitmap: Vec<Boolean<Fq>>,
    pub num_signers: FpVar<Fq>,
    pub aggregated_signature: G2Var,
}

impl ValidatorSetVar {
    /// Allocates `input` as witnesses. Each public key is checked to be on the curve.
    #[tracing::instrument(target = "r1cs", skip_all)]
    pub fn alloc(cs: ConstraintSystemRef<Fq>, input: &LightClientInput) -> Result<Self, SynthesisError> {
        let mut xs = vec![];
        let mut ys = vec![];
        let mut public_keys = vec![];
        for pk in &input.public_keys {
            let x = FpVar::new_witness(cs.clone(), || Ok(pk.x))?;
            let y = FpVar::new_witness(cs.clone(), || Ok(pk.y))?;
            // y^2 == x^3 + 1
            y.square()?
                .enforce_equal(&(x.square()? * &x + FpVar::one()))?;
            public_keys.push(ProjectiveVar::new(x.clone(), y.clone(), FpVar::one()));
            xs.push(x);
            ys.push(y);
        }

        let voting_powers = input
            .voting_powers
            .iter()
            .map(|p| FpVar::new_witness(cs.clone(), || Ok(Fq::from(*p))))
            .collect::<Result<Vec<_>, _>>()?;
        let bitmap = input
            .bitmap
            .iter()
            .map(|b| Boolean::new_witness(cs.clone(), || Ok(*b)))
            .collect::<Result<Vec<_>, _>>()?;
        let num_validators = FpVar::new_witness(cs.clone(), || Ok(Fq::from(input.num_validators)))?;
        let num_signers = FpVar::new_witness(cs.clone(), || Ok(Fq::from(input.num_signers)))?;
        let aggregated_signature = G2Var::new_variable_omit_prime_order_check(
            cs,
            || Ok(G2Projective::from(input.aggregated_signature)),
            AllocationMode::Witness,
        )?;

        Ok(Self {
            xs,
            ys,
            public_keys,
            voting_powers,
            num_validators,
            bitmap,
            num_signers,
            aggregated_signature,
        })
    }

    /// Recomputes the validator set commitment, given the activity flag of each slot
    #[tracing::instrument(target = "r1cs", skip_all)]
    pub fn root(&self, active: &[Boolean<Fq>]) -> Result<FpVar<Fq>, SynthesisError> {
        let mut level = vec![];
        for (((x, y), power), active) in self
            .xs
            .iter()
            .zip(&self.ys)
            .zip(&self.voting_powers)
            .zip(active)
        {
            let leaf = Hasher::hash(&[x.clone(), y.clone(), power.clone()])?;
            level.push(active.select(&leaf, &FpVar::zero())?);
        }
        while level.len() > 1 {
            level = level
                .chunks(2)
                .map(Hasher::hash)
                .collect::<Result<Vec<_>, _>>()?;
        }
        let tree_root = level.pop().ok_or(SynthesisError::Unsatisfiable)?;
        Hasher::hash(&[self.num_validators.clone(), tree_root])
    }

    /// Enforces that the set commits to the root with limbs `(root_hi, root_lo)` and that the
    /// validators flagged in the bitmap signed `message_hash`
    #[tracing::instrument(target = "r1cs", skip_all)]
    pub fn enforce(
        &self,
        message_hash: &G2Var,
        root_hi: &FpVar<Fq>,
        root_lo: &FpVar<Fq>,
    ) -> Result<(), SynthesisError> {
        let span = span!(Level::TRACE, "ValidatorSetVar_enforce");
        let _enter = span.enter();

        let active = active_slots(&self.num_validators, self.public_keys.len())?;

        debug!("enforcing validator set root");
        enforce_digest(&self.root(&active)?, root_hi, root_lo)?;

        debug!("enforcing signature");
        self.bitmap.enforce_within(&active)?;
        BlsGadget::verify(
            &self.public_keys,
            &self.bitmap,
            message_hash,
            &self.aggregated_signature,
            &self.num_signers,
        )
    }
}
