//! ICS23-style Merkle membership.
//!
//! A proof hashes a leaf `H(LEAF_PREFIX, key_hi, key_lo, value_hi, value_lo)` and folds it up a
//! fixed-capacity path of inner nodes. Each active node either carries a two-word prefix (the
//! running digest is the right child, `H(INNER_PREFIX, p1, child)`) or a one-word prefix and a
//! one-word suffix (the running digest is the left child, `H(INNER_PREFIX, child, s0)`). Nodes
//! past the proof's depth pass the digest through unchanged.
use crate::{
    utils::{active_slots, digest_limbs_var, limb_to_field_var},
    MimcGadget,
};
use ark_ff::PrimeField;
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::SynthesisError;
use lightclient_crypto::{
    hashers::{INNER_PREFIX, LEAF_PREFIX},
    MimcField,
};
use std::{cmp::Ordering, marker::PhantomData};
use tracing::{debug, span, Level};

/// Inner node of a membership path
#[derive(Clone, Debug)]
pub struct InnerNodeVar<CF: PrimeField, V> {
    pub prefix: [V; 2],
    pub prefix_len: FpVar<CF>,
    pub suffix: V,
    pub suffix_len: FpVar<CF>,
}

/// Existence proof of a hashed key/value pair. Key and value are given as native 128-bit limbs.
#[derive(Clone, Debug)]
pub struct ExistenceProofVar<CF: PrimeField, V> {
    pub key_hi: FpVar<CF>,
    pub key_lo: FpVar<CF>,
    pub value_hi: FpVar<CF>,
    pub value_lo: FpVar<CF>,
    pub leaf_prefix: V,
    pub path: Vec<InnerNodeVar<CF, V>>,
    pub depth: FpVar<CF>,
}

/// A proof folded up its path
struct Walk<CF: PrimeField, V> {
    /// Digest entering each node
    children: Vec<V>,
    /// Whether each node keeps the running digest on the right
    is_long: Vec<Boolean<CF>>,
    active: Vec<Boolean<CF>>,
    root: V,
}

/// Membership gadget, generic over the field variable the hash is computed with
pub struct MembershipGadget<F, CF, V> {
    field_type: PhantomData<F>,
    constraint_field_type: PhantomData<CF>,
    field_var_type: PhantomData<V>,
}

impl<F, CF, V> MembershipGadget<F, CF, V>
where
    F: MimcField,
    CF: PrimeField,
    V: FieldVar<F, CF>,
{
    /// Hashes the leaf of `proof`, enforcing its prefix is `LEAF_PREFIX`
    pub fn leaf_hash(proof: &ExistenceProofVar<CF, V>) -> Result<V, SynthesisError> {
        proof
            .leaf_prefix
            .enforce_equal(&V::constant(F::from(LEAF_PREFIX)))?;

        let limbs = [
            &proof.key_hi,
            &proof.key_lo,
            &proof.value_hi,
            &proof.value_lo,
        ]
        .iter()
        .map(|limb| limb_to_field_var::<F, CF, V>(limb))
        .collect::<Result<Vec<_>, _>>()?;

        let mut input = vec![proof.leaf_prefix.clone()];
        input.extend(limbs);
        MimcGadget::<F, CF, V>::hash(&input)
    }

    fn walk(proof: &ExistenceProofVar<CF, V>) -> Result<Walk<CF, V>, SynthesisError> {
        let mut digest = Self::leaf_hash(proof)?;
        let active = active_slots(&proof.depth, proof.path.len())?;
        let inner_prefix = V::constant(F::from(INNER_PREFIX));
        let one = FpVar::constant(CF::one());
        let two = FpVar::constant(CF::from(2u64));

        let mut children = Vec::with_capacity(proof.path.len());
        let mut is_long = Vec::with_capacity(proof.path.len());
        for (node, active) in proof.path.iter().zip(&active) {
            let long = MimcGadget::<F, CF, V>::hash(&[
                node.prefix[0].clone(),
                node.prefix[1].clone(),
                digest.clone(),
            ])?;
            let short = MimcGadget::<F, CF, V>::hash(&[
                node.prefix[0].clone(),
                digest.clone(),
                node.suffix.clone(),
            ])?;
            let long_node = node.prefix_len.is_eq(&two)?;
            let parent = long_node.select(&long, &short)?;

            // prefix_len in {1, 2}, prefix_len + suffix_len == 2 and prefix[0] == INNER_PREFIX
            let shape = (&node.prefix_len - &one) * (&node.prefix_len - &two);
            shape.conditional_enforce_equal(&FpVar::zero(), active)?;
            (&node.prefix_len + &node.suffix_len).conditional_enforce_equal(&two, active)?;
            node.prefix[0].conditional_enforce_equal(&inner_prefix, active)?;

            children.push(digest.clone());
            is_long.push(long_node);
            digest = active.select(&parent, &digest)?;
        }

        Ok(Walk {
            children,
            is_long,
            active,
            root: digest,
        })
    }

    /// Computes the root committed to by `proof`, enforcing the shape of every active node and
    /// `depth <= path.len()`
    #[tracing::instrument(target = "r1cs", skip_all)]
    pub fn root(proof: &ExistenceProofVar<CF, V>) -> Result<V, SynthesisError> {
        let span = span!(Level::TRACE, "MembershipGadget_root");
        let _enter = span.enter();

        Ok(Self::walk(proof)?.root)
    }

    /// The `(hi, lo)` digest limbs of the proof's root
    pub fn root_limbs(
        proof: &ExistenceProofVar<CF, V>,
    ) -> Result<(FpVar<CF>, FpVar<CF>), SynthesisError> {
        digest_limbs_var(&Self::root(proof)?)
    }

    /// Enforces that `proof` commits to the root with digest limbs `(root_hi, root_lo)`
    #[tracing::instrument(target = "r1cs", skip_all)]
    pub fn enforce_existence(
        proof: &ExistenceProofVar<CF, V>,
        root_hi: &FpVar<CF>,
        root_lo: &FpVar<CF>,
    ) -> Result<(), SynthesisError> {
        let (hi, lo) = Self::root_limbs(proof)?;
        hi.enforce_equal(root_hi)?;
        lo.enforce_equal(root_lo)?;
        debug!("existence proof enforced");
        Ok(())
    }

    /// Enforces that `(key_hi, key_lo)` is absent from the tree: it falls between the keys of
    /// two consecutive leaves. A side with depth zero is absent and at least one must be present.
    /// Every present side must validate against the root. A lone left neighbour must be the
    /// last leaf of the tree and a lone right neighbour the first.
    ///
    /// Two leaves are consecutive when the left one turns left at the same node where the right
    /// one turns right, having gone only right (resp. left) below it. The node is the same when
    /// the child each path brings to it is the sibling the other path hashes it with.
    #[tracing::instrument(target = "r1cs", skip_all)]
    pub fn enforce_non_existence(
        key_hi: &FpVar<CF>,
        key_lo: &FpVar<CF>,
        left: &ExistenceProofVar<CF, V>,
        right: &ExistenceProofVar<CF, V>,
        root_hi: &FpVar<CF>,
        root_lo: &FpVar<CF>,
    ) -> Result<(), SynthesisError> {
        let left_present = left.depth.is_neq(&FpVar::zero())?;
        let right_present = right.depth.is_neq(&FpVar::zero())?;
        left_present
            .or(&right_present)?
            .enforce_equal(&Boolean::TRUE)?;

        let left_walk = Self::walk(left)?;
        let right_walk = Self::walk(right)?;
        for (walk, present) in [(&left_walk, &left_present), (&right_walk, &right_present)] {
            let (hi, lo) = digest_limbs_var(&walk.root)?;
            hi.conditional_enforce_equal(root_hi, present)?;
            lo.conditional_enforce_equal(root_lo, present)?;
        }

        let left_below = Self::is_key_less(&left.key_hi, &left.key_lo, key_hi, key_lo)?;
        left_below.conditional_enforce_equal(&Boolean::TRUE, &left_present)?;
        let right_above = Self::is_key_less(key_hi, key_lo, &right.key_hi, &right.key_lo)?;
        right_above.conditional_enforce_equal(&Boolean::TRUE, &right_present)?;

        let left_only = left_present.and(&right_present.not())?;
        for (long, active) in left_walk.is_long.iter().zip(&left_walk.active) {
            long.conditional_enforce_equal(&Boolean::TRUE, &left_only.and(active)?)?;
        }
        let right_only = right_present.and(&left_present.not())?;
        for (long, active) in right_walk.is_long.iter().zip(&right_walk.active) {
            long.conditional_enforce_equal(&Boolean::FALSE, &right_only.and(active)?)?;
        }

        let both = left_present.and(&right_present)?;
        let (left_child, left_sibling, left_turns) = Self::turn(left, &left_walk, true)?;
        let (right_child, right_sibling, right_turns) = Self::turn(right, &right_walk, false)?;
        left_turns.conditional_enforce_equal(&Boolean::TRUE, &both)?;
        right_turns.conditional_enforce_equal(&Boolean::TRUE, &both)?;
        left_child.conditional_enforce_equal(&right_sibling, &both)?;
        right_child.conditional_enforce_equal(&left_sibling, &both)?;

        debug!("non-existence proof enforced");
        Ok(())
    }

    /// Finds the first active node of the path which does not keep the running digest on the
    /// right (`from_right`) or on the left. Returns the digest entering it, the sibling it is
    /// hashed with there, and whether there is such a node.
    fn turn(
        proof: &ExistenceProofVar<CF, V>,
        walk: &Walk<CF, V>,
        from_right: bool,
    ) -> Result<(V, V, Boolean<CF>), SynthesisError> {
        let mut straight = Boolean::TRUE;
        let mut found = Boolean::FALSE;
        let mut child = V::zero();
        let mut sibling = V::zero();
        for (i, node) in proof.path.iter().enumerate() {
            let (keeps, node_sibling) = if from_right {
                (walk.is_long[i].clone(), &node.suffix)
            } else {
                (walk.is_long[i].not(), &node.prefix[1])
            };
            let turns = straight.and(&walk.active[i])?.and(&keeps.not())?;
            child = turns.select(&walk.children[i], &child)?;
            sibling = turns.select(node_sibling, &sibling)?;
            found = found.or(&turns)?;
            straight = straight.and(&keeps)?;
        }
        Ok((child, sibling, found))
    }

    /// Enforces that the root of `inner` is the value proven by `outer`, and that `outer`
    /// validates against the root with digest limbs `(root_hi, root_lo)`
    #[tracing::instrument(target = "r1cs", skip_all)]
    pub fn enforce_chained(
        inner: &ExistenceProofVar<CF, V>,
        outer: &ExistenceProofVar<CF, V>,
        root_hi: &FpVar<CF>,
        root_lo: &FpVar<CF>,
    ) -> Result<(), SynthesisError> {
        let (inner_hi, inner_lo) = Self::root_limbs(inner)?;
        inner_hi.enforce_equal(&outer.value_hi)?;
        inner_lo.enforce_equal(&outer.value_lo)?;
        Self::enforce_existence(outer, root_hi, root_lo)
    }

    /// `(a_hi, a_lo) < (b_hi, b_lo)` for 128-bit limbs
    fn is_key_less(
        a_hi: &FpVar<CF>,
        a_lo: &FpVar<CF>,
        b_hi: &FpVar<CF>,
        b_lo: &FpVar<CF>,
    ) -> Result<Boolean<CF>, SynthesisError> {
        let hi_less = a_hi.is_cmp(b_hi, Ordering::Less, false)?;
        let hi_equal = a_hi.is_eq(b_hi)?;
        let lo_less = a_lo.is_cmp(b_lo, Ordering::Less, false)?;
        hi_less.or(&hi_equal.and(&lo_less)?)
    }
}
