//! # State Membership Circuit
//!
//! Proves existence, non-existence or chained existence of a key in a state tree hashed with
//! MiMC over BLS12-377's scalar field, emulated in BW6-761's scalar field.

use crate::{
    ics23::{ChainedProof, ExistenceProof, Ics23Error, InnerOp, NonExistenceProof, LEAF_PREFIX},
    StateField as Fr,
};
use ark_bls12_377::Fq;
use ark_r1cs_std::{fields::fp::FpVar, fields::nonnative::NonNativeFieldVar, prelude::*};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use lightclient_crypto::hashers::{digest_limb_elements, DIGEST_WIDTH};
use lightclient_gadgets::{ExistenceProofVar, InnerNodeVar, MembershipGadget};
use tracing::{debug, info, span, Level};

type EmulatedVar = NonNativeFieldVar<Fr, Fq>;
type Gadget = MembershipGadget<Fr, Fq, EmulatedVar>;

/// The kind of statement a membership circuit proves. Each mode has its own circuit shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipMode {
    Existence,
    NonExistence,
    Chained,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MembershipStatement {
    Existence(ExistenceProof),
    NonExistence(NonExistenceProof),
    Chained(ChainedProof),
}

impl MembershipStatement {
    pub fn mode(&self) -> MembershipMode {
        match self {
            Self::Existence(_) => MembershipMode::Existence,
            Self::NonExistence(_) => MembershipMode::NonExistence,
            Self::Chained(_) => MembershipMode::Chained,
        }
    }

    /// The key and value exposed as public inputs. Non-existence exposes a zero value.
    pub fn key_value(&self) -> ([u8; DIGEST_WIDTH], [u8; DIGEST_WIDTH]) {
        match self {
            Self::Existence(proof) => (proof.key, proof.value),
            Self::NonExistence(proof) => (proof.key, [0u8; DIGEST_WIDTH]),
            Self::Chained(proof) => (proof.inner.key, proof.inner.value),
        }
    }

    fn proofs(&self) -> Vec<Option<&ExistenceProof>> {
        match self {
            Self::Existence(proof) => vec![Some(proof)],
            Self::NonExistence(proof) => vec![proof.left.as_ref(), proof.right.as_ref()],
            Self::Chained(proof) => vec![Some(&proof.inner), Some(&proof.outer)],
        }
    }
}

/// Membership circuit. Its public inputs are, in order, the `(hi, lo)` limbs of the root, of
/// the key and of the value.
#[derive(Clone, Debug)]
pub struct MembershipCircuit {
    pub statement: MembershipStatement,
    pub root: [u8; DIGEST_WIDTH],
    /// Capacity of every path
    pub max_depth: usize,
}

impl MembershipCircuit {
    pub fn new(
        statement: MembershipStatement,
        root: [u8; DIGEST_WIDTH],
        max_depth: usize,
    ) -> Result<Self, Ics23Error> {
        for proof in statement.proofs().into_iter().flatten() {
            if proof.depth() > max_depth {
                return Err(Ics23Error::PathTooLong {
                    depth: proof.depth(),
                    capacity: max_depth,
                });
            }
        }
        Ok(Self {
            statement,
            root,
            max_depth,
        })
    }

    /// A circuit of the given shape, used when running the setup
    pub fn empty(mode: MembershipMode, max_depth: usize) -> Self {
        let proof = ExistenceProof {
            key: [0u8; DIGEST_WIDTH],
            value: [0u8; DIGEST_WIDTH],
            leaf_prefix: Fr::from(LEAF_PREFIX),
            path: vec![],
        };
        let statement = match mode {
            MembershipMode::Existence => MembershipStatement::Existence(proof),
            MembershipMode::NonExistence => MembershipStatement::NonExistence(NonExistenceProof {
                key: [0u8; DIGEST_WIDTH],
                left: Some(proof),
                right: None,
            }),
            MembershipMode::Chained => MembershipStatement::Chained(ChainedProof {
                inner: proof.clone(),
                outer: proof,
            }),
        };
        Self {
            statement,
            root: [0u8; DIGEST_WIDTH],
            max_depth,
        }
    }

    pub fn public_inputs(&self) -> Vec<Fq> {
        let (key, value) = self.statement.key_value();
        membership_public_inputs(&self.root, &key, &value)
    }
}

/// The public inputs of the membership circuit in allocation order
pub fn membership_public_inputs(
    root: &[u8; DIGEST_WIDTH],
    key: &[u8; DIGEST_WIDTH],
    value: &[u8; DIGEST_WIDTH],
) -> Vec<Fq> {
    [root, key, value]
        .iter()
        .flat_map(|digest| {
            let (hi, lo) = digest_limb_elements::<Fq>(digest);
            [hi, lo]
        })
        .collect()
}

/// Allocates a proof padded to `max_depth` nodes. An absent proof is allocated with depth zero.
fn alloc_proof(
    cs: ConstraintSystemRef<Fq>,
    proof: Option<&ExistenceProof>,
    max_depth: usize,
) -> Result<ExistenceProofVar<Fq, EmulatedVar>, SynthesisError> {
    let limb = |value: Fq| FpVar::new_witness(cs.clone(), || Ok(value));
    let small = |value: u64| FpVar::new_witness(cs.clone(), || Ok(Fq::from(value)));
    let element = |value: Fr| EmulatedVar::new_witness(cs.clone(), || Ok(value));

    let zero = [0u8; DIGEST_WIDTH];
    let (key_hi, key_lo) = digest_limb_elements::<Fq>(proof.map_or(&zero, |p| &p.key));
    let (value_hi, value_lo) = digest_limb_elements::<Fq>(proof.map_or(&zero, |p| &p.value));
    let path = proof.map_or(&[][..], |p| &p.path[..]);

    let mut nodes = vec![];
    for i in 0..max_depth {
        let node = path.get(i).cloned().unwrap_or_else(InnerOp::padding);
        nodes.push(InnerNodeVar {
            prefix: [element(node.prefix[0])?, element(node.prefix[1])?],
            prefix_len: small(node.prefix_len as u64)?,
            suffix: element(node.suffix)?,
            suffix_len: small(node.suffix_len as u64)?,
        });
    }

    Ok(ExistenceProofVar {
        key_hi: limb(key_hi)?,
        key_lo: limb(key_lo)?,
        value_hi: limb(value_hi)?,
        value_lo: limb(value_lo)?,
        leaf_prefix: element(proof.map_or(Fr::from(LEAF_PREFIX), |p| p.leaf_prefix))?,
        path: nodes,
        depth: small(path.len() as u64)?,
    })
}

impl ConstraintSynthesizer<Fq> for MembershipCircuit {
    #[tracing::instrument(target = "r1cs", skip_all)]
    fn generate_constraints(self, cs: ConstraintSystemRef<Fq>) -> Result<(), SynthesisError> {
        let span = span!(Level::TRACE, "MembershipCircuit");
        let _enter = span.enter();
        info!("generating constraints");

        let inputs = self
            .public_inputs()
            .into_iter()
            .map(|value| FpVar::new_input(cs.clone(), || Ok(value)))
            .collect::<Result<Vec<_>, _>>()?;
        let (root_hi, root_lo) = (&inputs[0], &inputs[1]);
        let (key_hi, key_lo) = (&inputs[2], &inputs[3]);
        let (value_hi, value_lo) = (&inputs[4], &inputs[5]);

        let enforce_key_value = |proof: &ExistenceProofVar<Fq, EmulatedVar>| {
            proof.key_hi.enforce_equal(key_hi)?;
            proof.key_lo.enforce_equal(key_lo)?;
            proof.value_hi.enforce_equal(value_hi)?;
            proof.value_lo.enforce_equal(value_lo)
        };

        match &self.statement {
            MembershipStatement::Existence(proof) => {
                debug!("existence");
                let proof = alloc_proof(cs, Some(proof), self.max_depth)?;
                enforce_key_value(&proof)?;
                Gadget::enforce_existence(&proof, root_hi, root_lo)?;
            }
            MembershipStatement::NonExistence(proof) => {
                debug!("non-existence");
                let left = alloc_proof(cs.clone(), proof.left.as_ref(), self.max_depth)?;
                let right = alloc_proof(cs, proof.right.as_ref(), self.max_depth)?;
                value_hi.enforce_equal(&FpVar::zero())?;
                value_lo.enforce_equal(&FpVar::zero())?;
                Gadget::enforce_non_existence(key_hi, key_lo, &left, &right, root_hi, root_lo)?;
            }
            MembershipStatement::Chained(proof) => {
                debug!("chained");
                let inner = alloc_proof(cs.clone(), Some(&proof.inner), self.max_depth)?;
                let outer = alloc_proof(cs, Some(&proof.outer), self.max_depth)?;
                enforce_key_value(&inner)?;
                Gadget::enforce_chained(&inner, &outer, root_hi, root_lo)?;
            }
        }

        info!("constraints generated");
        Ok(())
    }
}
