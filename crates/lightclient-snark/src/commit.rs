use crate::encoding::EncodingError;
use ark_bls12_377::{Fq, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_ff::Zero;
use byteorder::{LittleEndian, WriteBytesExt};
use lightclient_crypto::{
    hash_to_field, hash_to_g2,
    hashers::{digest_limb_elements, to_digest, DIGEST_WIDTH},
    HashError, Mimc, PublicKey, Signature, SIG_DOMAIN,
};
use num_bigint::BigUint;
use thiserror::Error;

/// Message type of a precommit vote
pub const PRECOMMIT_TYPE: u8 = 2;

#[derive(Debug, Error)]
/// Errors raised while validating commits and building witnesses from them
pub enum CommitError {
    #[error("{count} validators exceed the capacity of {capacity}")]
    TooManyValidators { count: usize, capacity: usize },
    #[error("the bitmap sets {set} bits but {signatures} signatures were given")]
    SignatureCount { set: u64, signatures: usize },
    #[error("bitmap bit {index} is set but there are only {validators} validators")]
    BitmapOutOfRange { index: u64, validators: usize },
    #[error("validator {0} has the point at infinity as public key")]
    IdentityKey(usize),
    #[error("capacity {0} is not a non-zero power of two")]
    Capacity(usize),
    #[error("hash parameters: {0}")]
    Hash(#[from] HashError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// A validator and its voting power
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorEntry {
    pub public_key: PublicKey,
    pub voting_power: u64,
}

impl ValidatorEntry {
    pub fn new(public_key: PublicKey, voting_power: u64) -> Self {
        Self {
            public_key,
            voting_power,
        }
    }

    /// The elements the validator's leaf hashes: the public key's affine coordinates and the
    /// voting power
    pub fn leaf_preimage(&self) -> [Fq; 3] {
        let pk = self.public_key.as_ref();
        [pk.x, pk.y, Fq::from(self.voting_power)]
    }
}

/// Computes the commitment to a validator set padded to `capacity` slots.
///
/// Leaf `i` is `H(x_i, y_i, power_i)` for a present validator and zero for padding. The leaves
/// are folded pairwise into a complete binary tree and the commitment is
/// `H(num_validators, tree_root)`.
pub fn validator_set_root(
    validators: &[ValidatorEntry],
    capacity: usize,
) -> Result<Fq, CommitError> {
    if !capacity.is_power_of_two() {
        return Err(CommitError::Capacity(capacity));
    }
    if validators.len() > capacity {
        return Err(CommitError::TooManyValidators {
            count: validators.len(),
            capacity,
        });
    }

    let mut level = validators
        .iter()
        .map(|v| Mimc::hash(&v.leaf_preimage()))
        .collect::<Result<Vec<_>, _>>()?;
    level.resize(capacity, Fq::zero());
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(Mimc::hash)
            .collect::<Result<Vec<_>, _>>()?;
    }

    Ok(Mimc::hash(&[Fq::from(validators.len() as u64), level[0]])?)
}

/// A validator set together with the signatures a subset of it produced over a vote
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorSetCommit {
    pub validators: Vec<ValidatorEntry>,
    /// Signatures of the validators flagged in the bitmap, by ascending validator index
    pub signatures: Vec<Signature>,
    /// Bit `i` is set if validator `i` signed
    pub bitmap: BigUint,
}

impl ValidatorSetCommit {
    /// Checks the commit fits in `capacity` slots and that the bitmap agrees with the signatures
    pub fn validate(&self, capacity: usize) -> Result<(), CommitError> {
        if !capacity.is_power_of_two() {
            return Err(CommitError::Capacity(capacity));
        }
        if self.validators.len() > capacity {
            return Err(CommitError::TooManyValidators {
                count: self.validators.len(),
                capacity,
            });
        }
        if self.bitmap.bits() > self.validators.len() as u64 {
            return Err(CommitError::BitmapOutOfRange {
                index: self.bitmap.bits() - 1,
                validators: self.validators.len(),
            });
        }
        let set = self.bitmap.count_ones();
        if set != self.signatures.len() as u64 {
            return Err(CommitError::SignatureCount {
                set,
                signatures: self.signatures.len(),
            });
        }
        if let Some(i) = self
            .validators
            .iter()
            .position(|v| v.public_key.as_ref().is_zero())
        {
            return Err(CommitError::IdentityKey(i));
        }
        Ok(())
    }

    /// Whether validator `index` signed
    pub fn signed(&self, index: usize) -> bool {
        self.bitmap.bit(index as u64)
    }

    /// Sum of the voting power of all validators
    pub fn total_power(&self) -> u128 {
        self.validators
            .iter()
            .map(|v| v.voting_power as u128)
            .sum()
    }

    /// Sum of the voting power of the validators flagged in the bitmap
    pub fn signed_power(&self) -> u128 {
        self.validators
            .iter()
            .enumerate()
            .filter(|(i, _)| self.signed(*i))
            .map(|(_, v)| v.voting_power as u128)
            .sum()
    }

    pub fn aggregate_signature(&self) -> Signature {
        Signature::aggregate(&self.signatures)
    }

    /// The 32 byte commitment of the validator set
    pub fn root(&self, capacity: usize) -> Result<[u8; DIGEST_WIDTH], CommitError> {
        Ok(to_digest(&validator_set_root(&self.validators, capacity)?))
    }

    /// Lays the commit out in `capacity` slots for the circuit
    pub fn to_input(&self, capacity: usize) -> Result<LightClientInput, CommitError> {
        self.validate(capacity)?;
        let mut input = LightClientInput::empty(capacity);
        for (i, validator) in self.validators.iter().enumerate() {
            input.public_keys[i] = *validator.public_key.as_ref();
            input.voting_powers[i] = validator.voting_power;
            input.bitmap[i] = self.signed(i);
        }
        input.num_validators = self.validators.len() as u64;
        input.num_signers = self.signatures.len() as u64;
        input.aggregated_signature = *self.aggregate_signature().as_ref();
        Ok(input)
    }
}

/// A commit laid out in fixed capacity arrays. Padding slots hold the G1 generator with zero
/// voting power and an unset bit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LightClientInput {
    pub public_keys: Vec<G1Affine>,
    pub voting_powers: Vec<u64>,
    pub num_validators: u64,
    pub bitmap: Vec<bool>,
    pub num_signers: u64,
    pub aggregated_signature: G2Affine,
}

impl LightClientInput {
    /// An input with no validators, used when running the trusted setup
    pub fn empty(capacity: usize) -> Self {
        Self {
            public_keys: vec![G1Affine::generator(); capacity],
            voting_powers: vec![0; capacity],
            num_validators: 0,
            bitmap: vec![false; capacity],
            num_signers: 0,
            aggregated_signature: G2Affine::generator(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.public_keys.len()
    }
}

/// A precommit vote in its canonical form
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalVote {
    pub height: i64,
    pub round: i64,
    pub block_hash: [u8; 32],
    pub part_set_total: u32,
    pub part_set_hash: [u8; 32],
    pub chain_id: String,
}

impl CanonicalVote {
    /// The bytes validators sign: the message type, height and round as little endian 64 bit
    /// integers, the block id and the length prefixed chain id
    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        let mut bytes = vec![];
        bytes.write_u8(PRECOMMIT_TYPE)?;
        bytes.write_i64::<LittleEndian>(self.height)?;
        bytes.write_i64::<LittleEndian>(self.round)?;
        bytes.extend_from_slice(&self.block_hash);
        bytes.write_u32::<LittleEndian>(self.part_set_total)?;
        bytes.extend_from_slice(&self.part_set_hash);
        bytes.write_u32::<LittleEndian>(self.chain_id.len() as u32)?;
        bytes.extend_from_slice(self.chain_id.as_bytes());
        Ok(bytes)
    }

    /// The vote hashed onto two base field elements, the message the circuit maps to G2
    pub fn message(&self) -> Result<[Fq; 2], EncodingError> {
        Ok(hash_to_field(SIG_DOMAIN, &self.encode()?)?)
    }

    /// The vote hashed onto G2, the point validators sign
    pub fn message_hash(&self) -> Result<G2Affine, EncodingError> {
        Ok(hash_to_g2(SIG_DOMAIN, &self.encode()?)?)
    }
}

/// Everything the transition circuit is synthesized from
#[derive(Clone, Debug)]
pub struct TransitionWitness {
    pub trusted: LightClientInput,
    pub untrusted: LightClientInput,
    pub trusted_root: [u8; DIGEST_WIDTH],
    pub untrusted_root: [u8; DIGEST_WIDTH],
    pub message: [Fq; 2],
}

impl TransitionWitness {
    /// Builds the witness of a transition between two commits over `vote`
    pub fn new(
        trusted: &ValidatorSetCommit,
        untrusted: &ValidatorSetCommit,
        vote: &CanonicalVote,
        capacity: usize,
    ) -> Result<Self, CommitError> {
        Ok(Self {
            trusted: trusted.to_input(capacity)?,
            untrusted: untrusted.to_input(capacity)?,
            trusted_root: trusted.root(capacity)?,
            untrusted_root: untrusted.root(capacity)?,
            message: vote.message()?,
        })
    }

    /// A witness with empty validator sets, used when running the trusted setup
    pub fn empty(capacity: usize) -> Self {
        Self {
            trusted: LightClientInput::empty(capacity),
            untrusted: LightClientInput::empty(capacity),
            trusted_root: [0u8; DIGEST_WIDTH],
            untrusted_root: [0u8; DIGEST_WIDTH],
            message: [Fq::zero(); 2],
        }
    }

    pub fn public_inputs(&self) -> Vec<Fq> {
        transition_public_inputs(&self.trusted_root, &self.untrusted_root, &self.message)
    }
}

/// The public inputs of the transition circuit in allocation order: the trusted root's limbs,
/// the untrusted root's limbs and the message
pub fn transition_public_inputs(
    trusted_root: &[u8; DIGEST_WIDTH],
    untrusted_root: &[u8; DIGEST_WIDTH],
    message: &[Fq; 2],
) -> Vec<Fq> {
    let (trusted_hi, trusted_lo) = digest_limb_elements::<Fq>(trusted_root);
    let (untrusted_hi, untrusted_lo) = digest_limb_elements::<Fq>(untrusted_root);
    vec![
        trusted_hi,
        trusted_lo,
        untrusted_hi,
        untrusted_lo,
        message[0],
        message[1],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{generate_commit, sample_vote};
    use lightclient_crypto::test_helpers::keygen;

    #[test]
    fn root_depends_on_every_field() {
        let (_, commit) = generate_commit(3, 10, &[true, true, false], &sample_vote(1, 0));
        let root = commit.root(4).unwrap();

        let mut other = commit.clone();
        other.validators[1].voting_power += 1;
        assert_ne!(other.root(4).unwrap(), root);

        let mut other = commit.clone();
        other.validators[2].public_key = keygen().1;
        assert_ne!(other.root(4).unwrap(), root);

        // the count is committed to, so a trailing zero leaf cannot be added
        assert_ne!(commit.root(8).unwrap(), root);
    }

    #[test]
    fn root_matches_manual_fold() {
        let (_, commit) = generate_commit(2, 7, &[true, false], &sample_vote(1, 0));
        let leaves = commit
            .validators
            .iter()
            .map(|v| Mimc::hash(&v.leaf_preimage()).unwrap())
            .collect::<Vec<_>>();
        let tree = Mimc::hash(&[leaves[0], leaves[1]]).unwrap();
        let expected = Mimc::hash(&[Fq::from(2u64), tree]).unwrap();
        assert_eq!(validator_set_root(&commit.validators, 2).unwrap(), expected);
    }

    #[test]
    fn validation() {
        let (_, commit) = generate_commit(3, 1, &[true, false, true], &sample_vote(1, 0));
        commit.validate(4).unwrap();

        assert!(matches!(commit.validate(3), Err(CommitError::Capacity(3))));
        assert!(matches!(
            commit.validate(2),
            Err(CommitError::TooManyValidators { count: 3, capacity: 2 })
        ));

        let mut bad = commit.clone();
        bad.signatures.pop();
        assert!(matches!(
            bad.validate(4),
            Err(CommitError::SignatureCount { set: 2, signatures: 1 })
        ));

        let mut bad = commit.clone();
        bad.bitmap.set_bit(3, true);
        bad.signatures.push(bad.signatures[0]);
        assert!(matches!(
            bad.validate(4),
            Err(CommitError::BitmapOutOfRange { index: 3, validators: 3 })
        ));

        let mut bad = commit;
        bad.validators[1].public_key = PublicKey::from(G1Affine::zero());
        assert!(matches!(bad.validate(4), Err(CommitError::IdentityKey(1))));
    }

    #[test]
    fn powers() {
        let (_, commit) = generate_commit(4, 5, &[true, false, true, true], &sample_vote(1, 0));
        assert_eq!(commit.total_power(), 20);
        assert_eq!(commit.signed_power(), 15);
    }

    #[test]
    fn input_layout() {
        let (_, commit) = generate_commit(3, 2, &[false, true, true], &sample_vote(1, 0));
        let input = commit.to_input(4).unwrap();
        assert_eq!(input.capacity(), 4);
        assert_eq!(input.num_validators, 3);
        assert_eq!(input.num_signers, 2);
        assert_eq!(input.bitmap, vec![false, true, true, false]);
        assert_eq!(input.voting_powers, vec![2, 2, 2, 0]);
        assert_eq!(input.public_keys[3], G1Affine::generator());
        assert_eq!(
            input.aggregated_signature,
            *commit.aggregate_signature().as_ref()
        );
    }

    #[test]
    fn vote_encoding() {
        let vote = sample_vote(19, 0);
        let bytes = vote.encode().unwrap();
        assert_eq!(bytes[0], PRECOMMIT_TYPE);
        assert_eq!(&bytes[1..9], &19i64.to_le_bytes());
        assert_eq!(&bytes[9..17], &0i64.to_le_bytes());
        assert_eq!(bytes.len(), 1 + 8 + 8 + 32 + 4 + 32 + 4 + vote.chain_id.len());

        let mut other = vote.clone();
        other.round = 1;
        assert_ne!(other.message().unwrap(), vote.message().unwrap());
    }
}
