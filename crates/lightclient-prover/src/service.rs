use crate::{
    artifacts::Artifacts,
    config::ProverConfig,
    error::Error,
    types::{ProveRequest, ProveResponse, VerifyRequest},
};
use ark_std::{end_timer, start_timer};
use lightclient_snark::{
    commit::TransitionWitness,
    encoding::{decode_digest, decode_message, decode_proof, encode_message, EncodedProof},
    export_verifier_source, prove_transition, stats, verify_transition, CircuitStats,
    VerificationError,
};
use std::sync::Arc;
use tokio::{sync::Semaphore, task};
use tracing::{error, info};

/// Called after every proving request. Proving allocates a lot, a deployment can use this to
/// hand memory back to the system.
pub trait MemoryReclaim: Send + Sync {
    fn reclaim(&self);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoReclaim;

impl MemoryReclaim for NoReclaim {
    fn reclaim(&self) {}
}

/// Proves and verifies transitions. Construction requires finished artifacts, so every request
/// sees the same circuit and keys.
pub struct ProverService {
    config: ProverConfig,
    artifacts: Arc<Artifacts>,
    gate: Arc<Semaphore>,
    reclaim: Arc<dyn MemoryReclaim>,
}

impl ProverService {
    pub fn new(config: ProverConfig, artifacts: Artifacts) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            gate: Arc::new(Semaphore::new(config.max_in_flight)),
            config,
            artifacts: Arc::new(artifacts),
            reclaim: Arc::new(NoReclaim),
        })
    }

    /// Loads the artifacts named in `config`, generating them first if needed
    pub fn setup(config: ProverConfig) -> Result<Self, Error> {
        config.validate()?;
        let artifacts = Artifacts::load_or_compile(
            &config.artifacts,
            config.max_validators,
            &mut rand::thread_rng(),
        )?;
        Self::new(config, artifacts)
    }

    pub fn with_reclaim<M: MemoryReclaim + 'static>(mut self, reclaim: M) -> Self {
        self.reclaim = Arc::new(reclaim);
        self
    }

    pub fn config(&self) -> &ProverConfig {
        &self.config
    }

    /// Proving slots currently free
    pub fn available_permits(&self) -> usize {
        self.gate.available_permits()
    }

    /// Proves that the untrusted commit follows from the trusted one. Waits while
    /// `max_in_flight` proofs are being generated.
    ///
    /// The slot is held by the proving task itself, so a request dropped while proving keeps
    /// its slot until the proof is done.
    pub async fn prove(&self, request: ProveRequest) -> Result<ProveResponse, Error> {
        let permit = self.gate.clone().acquire_owned().await?;
        let artifacts = self.artifacts.clone();
        let config = self.config.clone();
        let reclaim = self.reclaim.clone();
        task::spawn_blocking(move || {
            let result = prove_request(&artifacts, &config, request);
            reclaim.reclaim();
            drop(permit);
            result
        })
        .await?
    }

    /// Checks a transition proof. Malformed input is an error, a proof which does not verify
    /// is `Ok(false)`.
    pub async fn verify(&self, request: VerifyRequest) -> Result<bool, Error> {
        let artifacts = self.artifacts.clone();
        task::spawn_blocking(move || verify_request(&artifacts, &request)).await?
    }

    /// Solidity source holding the verifying key
    pub fn export_verifier_source(&self) -> Result<String, Error> {
        Ok(export_verifier_source(self.artifacts.verifying_key())?)
    }

    pub fn stats(&self) -> CircuitStats {
        stats(&self.artifacts.parameters)
    }
}

fn prove_request(
    artifacts: &Artifacts,
    config: &ProverConfig,
    request: ProveRequest,
) -> Result<ProveResponse, Error> {
    let trusted = request.trusted.decode()?;
    let untrusted = request.untrusted.decode()?;
    let vote = request.vote.decode()?;

    let capacity = config.max_validators;
    trusted.validate(capacity)?;
    untrusted.validate(capacity)?;
    config
        .trusted_quorum
        .check("trusted", trusted.signed_power(), trusted.total_power())?;
    config
        .untrusted_quorum
        .check("untrusted", untrusted.signed_power(), untrusted.total_power())?;

    let witness = TransitionWitness::new(&trusted, &untrusted, &vote, capacity)?;
    let (trusted_root, untrusted_root, message) =
        (witness.trusted_root, witness.untrusted_root, witness.message);
    info!(
        "Proving height {} round {}, {} trusted and {} untrusted validators",
        vote.height,
        vote.round,
        trusted.validators.len(),
        untrusted.validators.len()
    );

    let time = start_timer!(|| "Generate proof");
    let proof = prove_transition(&artifacts.parameters, witness, &mut rand::thread_rng())?;
    end_timer!(time);

    if let Err(e) = verify_transition(
        artifacts.verifying_key(),
        &trusted_root,
        &untrusted_root,
        &message,
        &proof,
    ) {
        error!("Freshly generated proof does not verify: {}", e);
    }

    Ok(ProveResponse {
        proof: EncodedProof::new(&proof)?.into(),
        trusted_root: trusted_root.to_vec(),
        untrusted_root: untrusted_root.to_vec(),
        message: encode_message(&message),
    })
}

fn verify_request(artifacts: &Artifacts, request: &VerifyRequest) -> Result<bool, Error> {
    let trusted_root = decode_digest("trusted_root", &request.trusted_root)?;
    let untrusted_root = decode_digest("untrusted_root", &request.untrusted_root)?;
    let message = decode_message(&request.message)?;
    let proof = decode_proof(&request.proof)?;

    match verify_transition(
        artifacts.verifying_key(),
        &trusted_root,
        &untrusted_root,
        &message,
        &proof,
    ) {
        Ok(()) => Ok(true),
        Err(VerificationError::VerificationFailed) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        quorum::QuorumError,
        types::{CommitData, VoteData},
    };
    use ark_bls12_377::Fq;
    use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
    use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
    use lightclient_snark::{
        commit::transition_public_inputs,
        create_proof,
        encoding::EncodingError,
        generate_parameters,
        test_helpers::{generate_commit, sample_vote},
    };
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Mutex,
    };

    /// Exposes its values as public inputs, each copied from a witness
    #[derive(Clone)]
    struct Mirror(Vec<Fq>);

    impl ConstraintSynthesizer<Fq> for Mirror {
        fn generate_constraints(self, cs: ConstraintSystemRef<Fq>) -> Result<(), SynthesisError> {
            for value in self.0 {
                let input = FpVar::new_input(cs.clone(), || Ok(value))?;
                let copy = FpVar::new_witness(cs.clone(), || Ok(value))?;
                input.enforce_equal(&copy)?;
            }
            Ok(())
        }
    }

    struct Counter(Arc<AtomicUsize>);

    impl MemoryReclaim for Counter {
        fn reclaim(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Signals when it is called, then blocks until released
    struct Hold {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl MemoryReclaim for Hold {
        fn reclaim(&self) {
            let _ = self.entered.lock().unwrap().send(());
            let _ = self.release.lock().unwrap().recv();
        }
    }

    const ROOTS: ([u8; 32], [u8; 32]) = ([1u8; 32], [2u8; 32]);

    fn message() -> [Fq; 2] {
        [Fq::from(3u64), Fq::from(4u64)]
    }

    fn inputs() -> Vec<Fq> {
        transition_public_inputs(&ROOTS.0, &ROOTS.1, &message())
    }

    /// A service whose keys have the shape of the transition circuit's public inputs
    fn mirror_service() -> ProverService {
        let params = generate_parameters(Mirror(inputs()), &mut rand::thread_rng()).unwrap();
        let config = ProverConfig {
            max_validators: 4,
            ..Default::default()
        };
        ProverService::new(config, Artifacts::new(params)).unwrap()
    }

    fn request_for(proof: &[u8]) -> VerifyRequest {
        VerifyRequest {
            proof: proof.to_vec(),
            trusted_root: ROOTS.0.to_vec(),
            untrusted_root: ROOTS.1.to_vec(),
            message: encode_message(&message()),
        }
    }

    #[tokio::test]
    async fn verify_reports_validity() {
        let service = mirror_service();
        let proof = create_proof(
            &service.artifacts.parameters,
            Mirror(inputs()),
            &mut rand::thread_rng(),
        )
        .unwrap();
        let encoded = EncodedProof::new(&proof).unwrap();

        let request = request_for(&encoded.compressed);
        assert!(service.verify(request.clone()).await.unwrap());
        assert!(service
            .verify(request_for(&encoded.uncompressed))
            .await
            .unwrap());

        let mut swapped = request.clone();
        std::mem::swap(&mut swapped.trusted_root, &mut swapped.untrusted_root);
        assert!(!service.verify(swapped).await.unwrap());

        let mut short = request.clone();
        short.trusted_root.pop();
        assert!(matches!(
            service.verify(short).await,
            Err(Error::Encoding(EncodingError::WrongWidth {
                field: "trusted_root",
                ..
            }))
        ));

        let mut non_canonical = request;
        non_canonical.message = vec![0xff; 96];
        assert!(matches!(
            service.verify(non_canonical).await,
            Err(Error::Encoding(EncodingError::NonCanonical(_)))
        ));

        assert!(service.verify(request_for(&[0u8; 7])).await.is_err());
    }

    /// A request whose trusted commit lacks a quorum: 10 of 40 is not more than a third
    fn weak_trusted_request() -> ProveRequest {
        let vote = sample_vote(19, 0);
        let (_, trusted) = generate_commit(4, 10, &[true, false, false, false], &vote);
        let (_, untrusted) = generate_commit(4, 10, &[true; 4], &vote);
        ProveRequest {
            trusted: CommitData::encode(&trusted).unwrap(),
            untrusted: CommitData::encode(&untrusted).unwrap(),
            vote: VoteData::from(&vote),
        }
    }

    #[tokio::test]
    async fn quorum_is_checked_before_proving() {
        let reclaimed = Arc::new(AtomicUsize::new(0));
        let service = mirror_service().with_reclaim(Counter(reclaimed.clone()));

        match service.prove(weak_trusted_request()).await {
            Err(Error::Quorum(QuorumError::Insufficient {
                commit,
                signed,
                required,
            })) => {
                assert_eq!(commit, "trusted");
                assert_eq!(signed, 10);
                assert_eq!(required, 14);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(reclaimed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropped_requests_keep_their_slot_until_done() {
        let (entered_tx, entered) = mpsc::channel();
        let (release, release_rx) = mpsc::channel();
        let service = mirror_service().with_reclaim(Hold {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        assert_eq!(service.available_permits(), 1);

        {
            let prove = service.prove(weak_trusted_request());
            tokio::pin!(prove);
            // give up on the request once its task is running
            tokio::select! {
                _ = &mut prove => panic!("the request finished while held"),
                _ = task::spawn_blocking(move || entered.recv()) => {}
            }
        }
        assert_eq!(service.available_permits(), 0);

        release.send(()).unwrap();
        drop(service.gate.acquire().await.unwrap());
        assert_eq!(service.available_permits(), 1);
    }

    #[tokio::test]
    async fn oversized_sets_are_rejected() {
        let service = mirror_service();
        let vote = sample_vote(19, 0);
        let (_, commit) = generate_commit(5, 10, &[true; 5], &vote);
        let request = ProveRequest {
            trusted: CommitData::encode(&commit).unwrap(),
            untrusted: CommitData::encode(&commit).unwrap(),
            vote: VoteData::from(&vote),
        };
        assert!(matches!(
            service.prove(request).await,
            Err(Error::Commit(_))
        ));
    }

    #[test]
    fn exports_and_reports() {
        let service = mirror_service();
        let stats = service.stats();
        assert_eq!(stats.num_instance_variables, 7);
        assert_eq!(stats.num_constraints, 6);

        let source = service.export_verifier_source().unwrap();
        assert!(source.contains("NUM_PUBLIC_INPUTS = 6;"));
    }
}
