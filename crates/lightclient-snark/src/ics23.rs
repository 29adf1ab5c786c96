//! Native ICS23-style proofs over the state tree.
//!
//! Leaves hash `H(leaf_prefix, key_hi, key_lo, value_hi, value_lo)` where the key and value are
//! 32 byte digests split in 128 bit limbs. An inner node with children `(l, r)` hashes
//! `H(INNER_PREFIX, l, r)`, which a path step expresses either as a two word prefix
//! `[INNER_PREFIX, l]` when the running digest is the right child, or as a one word prefix and
//! the suffix `r` when it is the left child.
use crate::StateField as Fr;
use ark_ff::Zero;
use lightclient_crypto::{
    hashers::{digest_limbs, to_digest, DIGEST_WIDTH},
    HashError, Mimc,
};
use thiserror::Error;

pub use lightclient_crypto::hashers::{INNER_PREFIX, LEAF_PREFIX};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Ics23Error {
    #[error("inner node {0} has an invalid shape")]
    InvalidNode(usize),
    #[error("the leaf is not hashed with the leaf prefix")]
    InvalidLeaf,
    #[error("path of depth {depth} exceeds the capacity of {capacity}")]
    PathTooLong { depth: usize, capacity: usize },
    #[error("the tree has no leaves")]
    EmptyTree,
    #[error("a non-existence proof needs at least one neighbour")]
    NoNeighbours,
    #[error("the key is present in the tree")]
    KeyPresent,
    #[error("hash parameters: {0}")]
    Hash(#[from] HashError),
}

/// A step of a membership path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InnerOp {
    pub prefix: [Fr; 2],
    pub prefix_len: u8,
    pub suffix: Fr,
    pub suffix_len: u8,
}

impl InnerOp {
    /// Step where the running digest is the left child and `sibling` the right one
    pub fn left_child(sibling: Fr) -> Self {
        Self {
            prefix: [Fr::from(INNER_PREFIX), Fr::zero()],
            prefix_len: 1,
            suffix: sibling,
            suffix_len: 1,
        }
    }

    /// Step where the running digest is the right child and `sibling` the left one
    pub fn right_child(sibling: Fr) -> Self {
        Self {
            prefix: [Fr::from(INNER_PREFIX), sibling],
            prefix_len: 2,
            suffix: Fr::zero(),
            suffix_len: 0,
        }
    }

    /// The all zero step filling a path up to its capacity
    pub fn padding() -> Self {
        Self {
            prefix: [Fr::zero(); 2],
            prefix_len: 0,
            suffix: Fr::zero(),
            suffix_len: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.prefix[0] == Fr::from(INNER_PREFIX)
            && matches!((self.prefix_len, self.suffix_len), (2, 0) | (1, 1))
    }

    /// Hashes `child` into its parent
    pub fn apply(&self, child: Fr) -> Result<Fr, HashError> {
        if self.prefix_len == 2 {
            Mimc::hash(&[self.prefix[0], self.prefix[1], child])
        } else {
            Mimc::hash(&[self.prefix[0], child, self.suffix])
        }
    }
}

/// Proof that `key` maps to `value` in the tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExistenceProof {
    pub key: [u8; DIGEST_WIDTH],
    pub value: [u8; DIGEST_WIDTH],
    pub leaf_prefix: Fr,
    /// Steps from the leaf up to the root
    pub path: Vec<InnerOp>,
}

impl ExistenceProof {
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn leaf_hash(&self) -> Result<Fr, HashError> {
        let (key_hi, key_lo) = digest_limbs(&self.key);
        let (value_hi, value_lo) = digest_limbs(&self.value);
        Mimc::hash(&[
            self.leaf_prefix,
            Fr::from(key_hi),
            Fr::from(key_lo),
            Fr::from(value_hi),
            Fr::from(value_lo),
        ])
    }

    /// The root the proof commits to
    pub fn root(&self) -> Result<Fr, Ics23Error> {
        if self.leaf_prefix != Fr::from(LEAF_PREFIX) {
            return Err(Ics23Error::InvalidLeaf);
        }
        let mut digest = self.leaf_hash()?;
        for (i, op) in self.path.iter().enumerate() {
            if !op.is_valid() {
                return Err(Ics23Error::InvalidNode(i));
            }
            digest = op.apply(digest)?;
        }
        Ok(digest)
    }

    pub fn verify(&self, root: &[u8; DIGEST_WIDTH]) -> Result<bool, Ics23Error> {
        Ok(to_digest(&self.root()?) == *root)
    }
}

/// Proof that `key` is absent: existence proofs of its neighbours in key order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NonExistenceProof {
    pub key: [u8; DIGEST_WIDTH],
    pub left: Option<ExistenceProof>,
    pub right: Option<ExistenceProof>,
}

impl NonExistenceProof {
    /// Checks that the neighbours surround the key, prove against `root` and are consecutive
    /// leaves. A lone left neighbour must be the last leaf, a lone right one the first.
    pub fn verify(&self, root: &[u8; DIGEST_WIDTH]) -> Result<bool, Ics23Error> {
        match (&self.left, &self.right) {
            (None, None) => Err(Ics23Error::NoNeighbours),
            (Some(left), None) => {
                Ok(left.key < self.key && left.verify(root)? && is_right_most(&left.path))
            }
            (None, Some(right)) => {
                Ok(self.key < right.key && right.verify(root)? && is_left_most(&right.path))
            }
            (Some(left), Some(right)) => Ok(left.key < self.key
                && self.key < right.key
                && left.verify(root)?
                && right.verify(root)?
                && are_neighbours(&left.path, &right.path)),
        }
    }
}

fn is_right_most(path: &[InnerOp]) -> bool {
    path.iter().all(|op| op.prefix_len == 2)
}

fn is_left_most(path: &[InnerOp]) -> bool {
    path.iter().all(|op| op.prefix_len == 1)
}

/// Whether the leaves proven by `left` and `right` are consecutive. Read from the root, both
/// paths share their steps down to the node where they split. There `left` is the left child
/// and `right` the right one, and below it `left` only goes right and `right` only goes left.
fn are_neighbours(left: &[InnerOp], right: &[InnerOp]) -> bool {
    let shared = left
        .iter()
        .rev()
        .zip(right.iter().rev())
        .take_while(|(l, r)| l == r)
        .count();
    match (
        left.len().checked_sub(shared + 1),
        right.len().checked_sub(shared + 1),
    ) {
        (Some(l), Some(r)) => {
            left[l].prefix_len == 1
                && right[r].prefix_len == 2
                && is_right_most(&left[..l])
                && is_left_most(&right[..r])
        }
        _ => false,
    }
}

/// Proof of a key/value pair in a store whose root is itself a value of the outer tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainedProof {
    pub inner: ExistenceProof,
    pub outer: ExistenceProof,
}

impl ChainedProof {
    pub fn verify(&self, root: &[u8; DIGEST_WIDTH]) -> Result<bool, Ics23Error> {
        Ok(to_digest(&self.inner.root()?) == self.outer.value && self.outer.verify(root)?)
    }
}

/// A key sorted binary tree. An unpaired node at the end of a level moves up unchanged.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    leaves: Vec<([u8; DIGEST_WIDTH], [u8; DIGEST_WIDTH])>,
    levels: Vec<Vec<Fr>>,
}

impl MerkleTree {
    /// Builds the tree over `entries`. A key given twice keeps its first value.
    pub fn new(
        entries: impl IntoIterator<Item = ([u8; DIGEST_WIDTH], [u8; DIGEST_WIDTH])>,
    ) -> Result<Self, Ics23Error> {
        let mut leaves = entries.into_iter().collect::<Vec<_>>();
        leaves.sort_by(|a, b| a.0.cmp(&b.0));
        leaves.dedup_by(|a, b| a.0 == b.0);
        if leaves.is_empty() {
            return Err(Ics23Error::EmptyTree);
        }

        let mut level = leaves
            .iter()
            .map(|(key, value)| Self::leaf(*key, *value).leaf_hash())
            .collect::<Result<Vec<_>, _>>()?;
        let mut levels = vec![];
        while level.len() > 1 {
            let next = level
                .chunks(2)
                .map(|pair| match pair {
                    [l, r] => Mimc::hash(&[Fr::from(INNER_PREFIX), *l, *r]),
                    _ => Ok(pair[0]),
                })
                .collect::<Result<Vec<_>, _>>()?;
            levels.push(level);
            level = next;
        }
        levels.push(level);

        Ok(Self { leaves, levels })
    }

    fn leaf(key: [u8; DIGEST_WIDTH], value: [u8; DIGEST_WIDTH]) -> ExistenceProof {
        ExistenceProof {
            key,
            value,
            leaf_prefix: Fr::from(LEAF_PREFIX),
            path: vec![],
        }
    }

    pub fn root(&self) -> [u8; DIGEST_WIDTH] {
        // `new` guarantees a non empty top level
        to_digest(&self.levels[self.levels.len() - 1][0])
    }

    pub fn get(&self, key: &[u8; DIGEST_WIDTH]) -> Option<&[u8; DIGEST_WIDTH]> {
        self.position(key).ok().map(|i| &self.leaves[i].1)
    }

    fn position(&self, key: &[u8; DIGEST_WIDTH]) -> Result<usize, usize> {
        self.leaves.binary_search_by(|(k, _)| k.cmp(key))
    }

    fn prove_index(&self, mut index: usize) -> ExistenceProof {
        let (key, value) = self.leaves[index];
        let mut proof = Self::leaf(key, value);
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = index ^ 1;
            if sibling < level.len() {
                proof.path.push(if index % 2 == 0 {
                    InnerOp::left_child(level[sibling])
                } else {
                    InnerOp::right_child(level[sibling])
                });
            }
            index /= 2;
        }
        proof
    }

    /// Existence proof of `key`, if present
    pub fn prove(&self, key: &[u8; DIGEST_WIDTH]) -> Option<ExistenceProof> {
        self.position(key).ok().map(|i| self.prove_index(i))
    }

    /// Non-existence proof of `key` from its neighbours
    pub fn prove_absence(&self, key: &[u8; DIGEST_WIDTH]) -> Result<NonExistenceProof, Ics23Error> {
        let index = match self.position(key) {
            Ok(_) => return Err(Ics23Error::KeyPresent),
            Err(index) => index,
        };
        Ok(NonExistenceProof {
            key: *key,
            left: index.checked_sub(1).map(|i| self.prove_index(i)),
            right: (index < self.leaves.len()).then(|| self.prove_index(index)),
        })
    }
}
