use ark_bls12_377::Fq;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use ark_std::{end_timer, start_timer};
use lightclient_snark::{
    commit::TransitionWitness,
    encoding::{decode_proof, EncodedProof, EVM_PROOF_WIDTH},
    gadgets::TransitionCircuit,
    prove_transition, trusted_setup, verify_transition, ProvingError, VerificationError,
};

use fixtures::{generate_test_data, vote, CAPACITY};

fn is_satisfied(witness: TransitionWitness) -> bool {
    let cs = ConstraintSystem::<Fq>::new_ref();
    TransitionCircuit::new(witness)
        .generate_constraints(cs.clone())
        .unwrap();
    cs.is_satisfied().unwrap()
}

#[test]
fn transition_satisfied() {
    let (trusted, untrusted, vote) = generate_test_data(19);
    let witness = TransitionWitness::new(&trusted, &untrusted, &vote, CAPACITY).unwrap();
    assert!(is_satisfied(witness));
}

#[test]
fn tampered_commits_are_unsatisfiable() {
    let (trusted, untrusted, signed_vote) = generate_test_data(19);

    // one validator signed another block
    let other = vote(20).message_hash().unwrap();
    let (secret_keys, mut forged) = fixtures::signed_commit(CAPACITY, &signed_vote);
    forged.signatures[2] = secret_keys[2].sign_hashed(&other);
    let witness = TransitionWitness::new(&trusted, &forged, &signed_vote, CAPACITY).unwrap();
    assert!(!is_satisfied(witness));

    // the witness claims the root of the set before a voting power changed
    let mut witness = TransitionWitness::new(&trusted, &untrusted, &signed_vote, CAPACITY).unwrap();
    witness.untrusted.voting_powers[0] += 1;
    assert!(!is_satisfied(witness));
}

#[test]
#[ignore] // This test needs a lot of memory and takes too long. It works though!
fn prover_verifier_groth16() {
    tracing_subscriber::fmt::init();
    let rng = &mut rand::thread_rng();

    let params = trusted_setup(CAPACITY, rng).unwrap();
    let (trusted, untrusted, vote) = generate_test_data(19);
    let witness = TransitionWitness::new(&trusted, &untrusted, &vote, CAPACITY).unwrap();
    let (trusted_root, untrusted_root, message) =
        (witness.trusted_root, witness.untrusted_root, witness.message);

    let prove_time = start_timer!(|| "Groth16 prove time");
    let proof = prove_transition(&params, witness, rng).unwrap();
    end_timer!(prove_time);

    let verify_time = start_timer!(|| "Groth16 verify time");
    verify_transition(
        params.verifying_key(),
        &trusted_root,
        &untrusted_root,
        &message,
        &proof,
    )
    .unwrap();
    end_timer!(verify_time);

    // swapped roots
    let res = verify_transition(
        params.verifying_key(),
        &untrusted_root,
        &trusted_root,
        &message,
        &proof,
    );
    assert!(matches!(res, Err(VerificationError::VerificationFailed)));

    let encoded = EncodedProof::new(&proof).unwrap();
    assert_eq!(encoded.evm.len(), EVM_PROOF_WIDTH);
    assert_eq!(decode_proof(&encoded.compressed).unwrap(), proof);

    // a witness which does not satisfy the circuit is refused before proving
    let mut witness = TransitionWitness::new(&trusted, &untrusted, &vote, CAPACITY).unwrap();
    witness.trusted.bitmap[1] = false;
    let res = prove_transition(&params, witness, rng);
    assert!(matches!(res, Err(ProvingError::Unsatisfied { .. })));
}
