use crate::commit::{CanonicalVote, ValidatorEntry, ValidatorSetCommit};
use lightclient_crypto::{test_helpers::keygen_mul, PrivateKey};
use num_bigint::BigUint;

/// A precommit vote for an arbitrary block at `height` and `round`
pub fn sample_vote(height: i64, round: i64) -> CanonicalVote {
    CanonicalVote {
        height,
        round,
        block_hash: [0xab; 32],
        part_set_total: 1,
        part_set_hash: [0xcd; 32],
        chain_id: "lightclient-test".to_string(),
    }
}

/// Generates `signed.len()` validators of equal `power` and the commit where the validators
/// flagged in `signed` sign `vote`
pub fn generate_commit(
    num_validators: usize,
    power: u64,
    signed: &[bool],
    vote: &CanonicalVote,
) -> (Vec<PrivateKey>, ValidatorSetCommit) {
    assert_eq!(num_validators, signed.len());
    let (secret_keys, public_keys) = keygen_mul(num_validators);
    let message_hash = vote.message_hash().unwrap();

    let mut bitmap = BigUint::from(0u8);
    let mut signatures = vec![];
    for (i, (sk, signed)) in secret_keys.iter().zip(signed).enumerate() {
        if *signed {
            bitmap.set_bit(i as u64, true);
            signatures.push(sk.sign_hashed(&message_hash));
        }
    }

    let commit = ValidatorSetCommit {
        validators: public_keys
            .into_iter()
            .map(|pk| ValidatorEntry::new(pk, power))
            .collect(),
        signatures,
        bitmap,
    };
    (secret_keys, commit)
}
