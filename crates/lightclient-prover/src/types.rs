use crate::error::Error;
use lightclient_snark::{
    commit::{CanonicalVote, ValidatorEntry, ValidatorSetCommit},
    encoding::{
        decode_digest, decode_public_key, decode_signature, encode_public_key, encode_signature,
        EncodedProof,
    },
};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorData {
    /// Compressed G1 point
    #[serde(with = "hex::serde")]
    pub public_key: Vec<u8>,
    pub voting_power: u64,
}

/// A validator set and the signatures over a vote, as received
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitData {
    pub validators: Vec<ValidatorData>,
    /// Compressed G2 points, one per set bit, by ascending validator index
    pub signatures: Vec<String>,
    /// Little endian, bit `i` set if validator `i` signed
    #[serde(with = "hex::serde")]
    pub bitmap: Vec<u8>,
}

impl CommitData {
    pub fn encode(commit: &ValidatorSetCommit) -> Result<Self, Error> {
        let validators = commit
            .validators
            .iter()
            .map(|v| {
                Ok(ValidatorData {
                    public_key: encode_public_key(&v.public_key)?,
                    voting_power: v.voting_power,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let signatures = commit
            .signatures
            .iter()
            .map(|s| Ok(hex::encode(encode_signature(s)?)))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(Self {
            validators,
            signatures,
            bitmap: commit.bitmap.to_bytes_le(),
        })
    }

    pub fn decode(&self) -> Result<ValidatorSetCommit, Error> {
        let validators = self
            .validators
            .iter()
            .map(|v| Ok(ValidatorEntry::new(decode_public_key(&v.public_key)?, v.voting_power)))
            .collect::<Result<Vec<_>, Error>>()?;
        let signatures = self
            .signatures
            .iter()
            .map(|s| Ok(decode_signature(&hex::decode(s)?)?))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(ValidatorSetCommit {
            validators,
            signatures,
            bitmap: BigUint::from_bytes_le(&self.bitmap),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteData {
    pub height: i64,
    pub round: i64,
    #[serde(with = "hex::serde")]
    pub block_hash: Vec<u8>,
    pub part_set_total: u32,
    #[serde(with = "hex::serde")]
    pub part_set_hash: Vec<u8>,
    pub chain_id: String,
}

impl VoteData {
    pub fn decode(&self) -> Result<CanonicalVote, Error> {
        Ok(CanonicalVote {
            height: self.height,
            round: self.round,
            block_hash: decode_digest("block_hash", &self.block_hash)?,
            part_set_total: self.part_set_total,
            part_set_hash: decode_digest("part_set_hash", &self.part_set_hash)?,
            chain_id: self.chain_id.clone(),
        })
    }
}

impl From<&CanonicalVote> for VoteData {
    fn from(vote: &CanonicalVote) -> Self {
        Self {
            height: vote.height,
            round: vote.round,
            block_hash: vote.block_hash.to_vec(),
            part_set_total: vote.part_set_total,
            part_set_hash: vote.part_set_hash.to_vec(),
            chain_id: vote.chain_id.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProveRequest {
    pub trusted: CommitData,
    pub untrusted: CommitData,
    pub vote: VoteData,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofData {
    #[serde(with = "hex::serde")]
    pub compressed: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub uncompressed: Vec<u8>,
    /// Laid out for an EVM pairing check
    #[serde(with = "hex::serde")]
    pub evm: Vec<u8>,
}

impl From<EncodedProof> for ProofData {
    fn from(proof: EncodedProof) -> Self {
        Self {
            compressed: proof.compressed,
            uncompressed: proof.uncompressed,
            evm: proof.evm,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProveResponse {
    pub proof: ProofData,
    #[serde(with = "hex::serde")]
    pub trusted_root: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub untrusted_root: Vec<u8>,
    /// The two field elements the vote hashes to, the last public inputs of the proof
    #[serde(with = "hex::serde")]
    pub message: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// Either arkworks serialization of the proof
    #[serde(with = "hex::serde")]
    pub proof: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub trusted_root: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub untrusted_root: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub message: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightclient_snark::{
        encoding::EncodingError,
        test_helpers::{generate_commit, sample_vote},
    };

    #[test]
    fn commit_decodes() {
        let vote = sample_vote(19, 0);
        let (_, commit) = generate_commit(3, 7, &[true, false, true], &vote);
        let data = CommitData::encode(&commit).unwrap();
        assert_eq!(data.bitmap, vec![0b101]);

        let json = serde_json::to_string(&data).unwrap();
        let parsed: CommitData = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.decode().unwrap(), commit);
    }

    #[test]
    fn vote_decodes() {
        let vote = sample_vote(19, 0);
        let data = VoteData::from(&vote);
        assert_eq!(data.decode().unwrap(), vote);

        let mut short = data;
        short.block_hash.pop();
        match short.decode() {
            Err(Error::Encoding(EncodingError::WrongWidth {
                field, actual, ..
            })) => {
                assert_eq!(field, "block_hash");
                assert_eq!(actual, 31);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn malformed_keys_are_rejected() {
        let vote = sample_vote(1, 0);
        let (_, commit) = generate_commit(1, 7, &[true], &vote);
        let mut data = CommitData::encode(&commit).unwrap();
        data.validators[0].public_key[3] ^= 0xff;
        assert!(data.decode().is_err());

        let mut data = CommitData::encode(&commit).unwrap();
        data.signatures[0] = "zz".to_string();
        assert!(matches!(data.decode(), Err(Error::Hex(_))));
    }

    #[test]
    fn flipped_signature_bytes_do_not_verify() {
        let vote = sample_vote(1, 0);
        let hash = vote.message_hash().unwrap();
        let (_, commit) = generate_commit(1, 7, &[true], &vote);
        let public_key = &commit.validators[0].public_key;
        public_key.verify_hashed(&hash, &commit.signatures[0]).unwrap();

        for position in [0, 17, 50, 80] {
            let mut data = CommitData::encode(&commit).unwrap();
            let mut bytes = hex::decode(&data.signatures[0]).unwrap();
            bytes[position] ^= 0x01;
            data.signatures[0] = hex::encode(bytes);

            // either the bytes are not a point of the subgroup, or a point the key did not sign
            if let Ok(forged) = data.decode() {
                assert_ne!(forged.signatures[0], commit.signatures[0]);
                assert!(public_key.verify_hashed(&hash, &forged.signatures[0]).is_err());
            }
        }
    }
}
