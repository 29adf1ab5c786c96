use crate::Bitmap;
use ark_ec::{pairing::Pairing, Group};
use ark_ff::PrimeField;
use ark_r1cs_std::{
    boolean::Boolean, eq::EqGadget, fields::fp::FpVar, fields::FieldVar, groups::CurveVar,
    pairing::PairingVar,
};
use ark_relations::r1cs::SynthesisError;
use std::marker::PhantomData;
use tracing::{debug, span, trace, Level};

/// Aggregate BLS verification in-circuit, with public keys on G1 and signatures on G2.
///
/// The signers are the keys whose bit is set in the bitmap. Their sum is checked against the
/// aggregate signature with a single product of two pairings
/// ([BDN18](https://eprint.iacr.org/2018/483.pdf), multi-signature verification).
pub struct BlsVerifyGadget<E, F, P> {
    pairing_engine_type: PhantomData<E>,
    constraint_field_type: PhantomData<F>,
    /// Must be the pairing gadget of `E`
    pairing_gadget_type: PhantomData<P>,
}

impl<E, F, P> BlsVerifyGadget<E, F, P>
where
    E: Pairing,
    F: PrimeField,
    P: PairingVar<E, F>,
{
    /// Enforces that the keys flagged in `signed_bitmap` signed `message_hash`, and that
    /// exactly `num_signers` bits are set.
    #[tracing::instrument(target = "r1cs", skip_all)]
    pub fn verify(
        pub_keys: &[P::G1Var],
        signed_bitmap: &[Boolean<F>],
        message_hash: &P::G2Var,
        signature: &P::G2Var,
        num_signers: &FpVar<F>,
    ) -> Result<(), SynthesisError> {
        let span = span!(Level::TRACE, "BlsVerifyGadget_verify");
        let _enter = span.enter();

        trace!("counting signers");
        signed_bitmap.enforce_popcount(num_signers)?;
        let aggregated_pk = Self::enforce_aggregated_pubkeys(pub_keys, signed_bitmap)?;

        Self::verify_aggregated(&aggregated_pk, message_hash, signature)
    }

    /// Enforces `e(-g1, σ) * e(apk, H(m)) == 1`
    #[tracing::instrument(target = "r1cs", skip_all)]
    pub fn verify_aggregated(
        aggregated_pk: &P::G1Var,
        message_hash: &P::G2Var,
        signature: &P::G2Var,
    ) -> Result<(), SynthesisError> {
        let neg_generator = P::G1Var::constant(E::G1::generator()).negate()?;
        let g1 = [P::prepare_g1(&neg_generator)?, P::prepare_g1(aggregated_pk)?];
        let g2 = [P::prepare_g2(signature)?, P::prepare_g2(message_hash)?];

        trace!("enforcing pairing product");
        P::product_of_pairings(&g1, &g2)?.enforce_equal(&P::GTVar::one())?;
        debug!("BLS equation enforced");
        Ok(())
    }

    /// Sum of the keys whose bit is set. The bitmap and the keys must have the same length.
    #[tracing::instrument(target = "r1cs", skip_all)]
    pub fn enforce_aggregated_pubkeys(
        pub_keys: &[P::G1Var],
        signed_bitmap: &[Boolean<F>],
    ) -> Result<P::G1Var, SynthesisError> {
        if signed_bitmap.len() != pub_keys.len() {
            return Err(SynthesisError::Unsatisfiable);
        }

        let mut aggregated_pk = P::G1Var::zero();
        for (pk, signed) in pub_keys.iter().zip(signed_bitmap) {
            aggregated_pk += &signed.select(pk, &P::G1Var::zero())?;
        }
        Ok(aggregated_pk)
    }
}

#[cfg(test)]
mod verify_one_message {
    use super::*;
    use crate::utils::test_helpers::{print_unsatisfied_constraints, run_profile_constraints};
    use lightclient_crypto::{hash_to_g2, test_helpers::*, PublicKey, Signature, SIG_DOMAIN};

    use ark_bls12_377::{
        constraints::{G1Var, G2Var, PairingVar as Bls12_377PairingGadget},
        Bls12_377, G1Projective, G2Affine, G2Projective,
    };
    use ark_bw6_761::Fr as BW6_761Fr;
    use ark_ff::UniformRand;
    use ark_r1cs_std::alloc::{AllocVar, AllocationMode};
    use ark_relations::r1cs::{ConstraintSystem, ConstraintSystemRef};

    type Gadget = BlsVerifyGadget<Bls12_377, BW6_761Fr, Bls12_377PairingGadget>;

    // converts the arguments to constraints and checks them against the `verify` function
    fn cs_verify(
        message_hash: G2Affine,
        pub_keys: &[PublicKey],
        signature: Signature,
        bitmap: &[bool],
        num_signers: u64,
    ) -> ConstraintSystemRef<BW6_761Fr> {
        let cs = ConstraintSystem::<BW6_761Fr>::new_ref();

        let message_hash_var = G2Var::new_variable_omit_prime_order_check(
            cs.clone(),
            || Ok(G2Projective::from(message_hash)),
            AllocationMode::Witness,
        )
        .unwrap();
        let signature_var = G2Var::new_variable_omit_prime_order_check(
            cs.clone(),
            || Ok(G2Projective::from(*signature.as_ref())),
            AllocationMode::Witness,
        )
        .unwrap();

        let pub_keys = pub_keys
            .iter()
            .map(|pub_key| {
                G1Var::new_variable_omit_prime_order_check(
                    cs.clone(),
                    || Ok(G1Projective::from(*pub_key.as_ref())),
                    AllocationMode::Witness,
                )
                .unwrap()
            })
            .collect::<Vec<_>>();
        let bitmap = bitmap
            .iter()
            .map(|b| Boolean::new_witness(cs.clone(), || Ok(*b)).unwrap())
            .collect::<Vec<_>>();

        let num_signers =
            FpVar::<BW6_761Fr>::new_witness(cs.clone(), || Ok(BW6_761Fr::from(num_signers)))
                .unwrap();
        Gadget::verify(
            &pub_keys,
            &bitmap,
            &message_hash_var,
            &signature_var,
            &num_signers,
        )
        .unwrap();

        cs
    }

    #[test]
    fn one_signature_ok() {
        run_profile_constraints(|| {
            let (secret_key, pub_key) = keygen();
            let message_hash = hash_to_g2(SIG_DOMAIN, b"one").unwrap();
            let signature = secret_key.sign_hashed(&message_hash);
            let fake_signature = Signature::from(G2Projective::rand(&mut rng()));

            // good sig passes
            let cs = cs_verify(message_hash, &[pub_key], signature, &[true], 1);
            print_unsatisfied_constraints(cs.clone());
            assert!(cs.is_satisfied().unwrap());

            // random sig fails
            let cs = cs_verify(message_hash, &[pub_key], fake_signature, &[true], 1);
            assert!(!cs.is_satisfied().unwrap());
        });
    }

    #[test]
    fn multiple_signatures_ok() {
        run_profile_constraints(|| {
            let message_hash = hash_to_g2(SIG_DOMAIN, b"multiple").unwrap();
            let (secret_keys, pub_keys) = keygen_mul(3);
            let (sigs, asig) = sign(&message_hash, &secret_keys);

            // good aggregate sig passes
            let cs = cs_verify(message_hash, &pub_keys, asig, &[true, true, true], 3);
            print_unsatisfied_constraints(cs.clone());
            assert!(cs.is_satisfied().unwrap());

            // a subset of signers with the matching bitmap passes
            let partial = Signature::aggregate(&sigs[..2]);
            let cs = cs_verify(message_hash, &pub_keys, partial, &[true, true, false], 2);
            print_unsatisfied_constraints(cs.clone());
            assert!(cs.is_satisfied().unwrap());

            // claiming the third signer with the partial signature fails
            let cs = cs_verify(message_hash, &pub_keys, partial, &[true, true, true], 3);
            assert!(!cs.is_satisfied().unwrap());

            // a wrong signer count fails even with a valid signature
            let cs = cs_verify(message_hash, &pub_keys, asig, &[true, true, true], 2);
            assert!(!cs.is_satisfied().unwrap());
        });
    }

    #[test]
    fn duplicate_keys_ok() {
        let message_hash = hash_to_g2(SIG_DOMAIN, b"doubling").unwrap();
        let (sk, pk) = keygen();
        let (_, asig) = sign(&message_hash, &[sk.clone(), sk]);

        let cs = cs_verify(message_hash, &[pk, pk], asig, &[true, true], 2);
        print_unsatisfied_constraints(cs.clone());
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn wrong_message_fails() {
        let message_hash = hash_to_g2(SIG_DOMAIN, b"signed").unwrap();
        let other_hash = hash_to_g2(SIG_DOMAIN, b"verified").unwrap();
        let (sk, pk) = keygen();
        let signature = sk.sign_hashed(&message_hash);

        let cs = cs_verify(other_hash, &[pk], signature, &[true], 1);
        assert!(!cs.is_satisfied().unwrap());
    }
}
