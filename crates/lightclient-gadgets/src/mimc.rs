use ark_ff::PrimeField;
use ark_r1cs_std::fields::FieldVar;
use ark_relations::r1cs::SynthesisError;
use lightclient_crypto::{hashers::MimcParameters, MimcField};
use std::marker::PhantomData;
use tracing::{span, trace, Level};

/// MiMC hash gadget, the in-circuit counterpart of [`lightclient_crypto::Mimc`].
///
/// The gadget is generic over the field variable: with `V = FpVar<F>` the hash is computed
/// over the circuit's own field, with `V = NonNativeFieldVar<F, CF>` it is emulated in limbs.
/// Both produce the digest the native hasher does for the same inputs.
#[derive(Clone, Debug)]
pub struct MimcGadget<F: 'static, CF, V> {
    params: &'static MimcParameters<F>,
    h: V,
    data: Vec<V>,
    constraint_field_type: PhantomData<CF>,
}

impl<F, CF, V> MimcGadget<F, CF, V>
where
    F: MimcField,
    CF: PrimeField,
    V: FieldVar<F, CF>,
{
    /// Starts a hash with a zero state. Fails if the field's parameters are invalid.
    pub fn new() -> Result<Self, SynthesisError> {
        let params = F::mimc_parameters().map_err(|e| {
            tracing::error!("mimc parameters: {}", e);
            SynthesisError::Unsatisfiable
        })?;
        Ok(MimcGadget {
            params,
            h: V::zero(),
            data: Vec::new(),
            constraint_field_type: PhantomData,
        })
    }

    /// Hashes `elements` with a fresh state
    pub fn hash(elements: &[V]) -> Result<V, SynthesisError> {
        let mut hasher = Self::new()?;
        hasher.write(elements);
        hasher.sum()
    }

    pub fn write(&mut self, elements: &[V]) {
        self.data.extend_from_slice(elements);
    }

    /// Absorbs the pending elements and returns the running digest
    #[tracing::instrument(target = "r1cs", skip(self))]
    pub fn sum(&mut self) -> Result<V, SynthesisError> {
        let span = span!(Level::TRACE, "MimcGadget_sum");
        let _enter = span.enter();
        trace!("absorbing {} elements", self.data.len());

        for m in std::mem::take(&mut self.data) {
            let r = self.encrypt(&m)?;
            self.h = self.h.clone() + r + m;
        }
        Ok(self.h.clone())
    }

    pub fn reset(&mut self) {
        self.data.clear();
        self.h = V::zero();
    }

    fn encrypt(&self, m: &V) -> Result<V, SynthesisError> {
        let exponent = [self.params.exponent()];
        let mut x = m.clone();
        for c in self.params.constants() {
            x = (x + &self.h + *c).pow_by_constant(exponent)?;
        }
        Ok(x + &self.h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_helpers::{print_unsatisfied_constraints, run_profile_constraints};
    use ark_bls12_377::{Fq, Fr};
    use ark_ff::UniformRand;
    use ark_r1cs_std::{
        alloc::AllocVar,
        eq::EqGadget,
        fields::{fp::FpVar, nonnative::NonNativeFieldVar},
        R1CSVar,
    };
    use ark_relations::r1cs::ConstraintSystem;
    use lightclient_crypto::Mimc;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    #[test]
    fn native_matches_hasher() {
        run_profile_constraints(|| {
            let rng = &mut XorShiftRng::seed_from_u64(13);
            let elements = (0..3).map(|_| Fq::rand(rng)).collect::<Vec<_>>();
            let expected = Mimc::<Fq>::hash(&elements).unwrap();

            let cs = ConstraintSystem::<Fq>::new_ref();
            let vars = elements
                .iter()
                .map(|e| FpVar::new_witness(cs.clone(), || Ok(*e)).unwrap())
                .collect::<Vec<_>>();
            let digest = MimcGadget::<Fq, Fq, FpVar<Fq>>::hash(&vars).unwrap();
            let expected_var = FpVar::new_input(cs.clone(), || Ok(expected)).unwrap();
            digest.enforce_equal(&expected_var).unwrap();

            print_unsatisfied_constraints(cs.clone());
            assert!(cs.is_satisfied().unwrap());
            assert_eq!(digest.value().unwrap(), expected);
        });
    }

    #[test]
    fn write_sum_reset() {
        let rng = &mut XorShiftRng::seed_from_u64(17);
        let elements = (0..2).map(|_| Fq::rand(rng)).collect::<Vec<_>>();
        let cs = ConstraintSystem::<Fq>::new_ref();
        let vars = elements
            .iter()
            .map(|e| FpVar::new_witness(cs.clone(), || Ok(*e)).unwrap())
            .collect::<Vec<_>>();

        let mut hasher = MimcGadget::<Fq, Fq, FpVar<Fq>>::new().unwrap();
        hasher.write(&vars[..1]);
        hasher.sum().unwrap();
        hasher.write(&vars[1..]);
        let stepwise = hasher.sum().unwrap();
        assert_eq!(stepwise.value().unwrap(), Mimc::hash(&elements).unwrap());

        hasher.reset();
        assert_eq!(hasher.sum().unwrap().value().unwrap(), Fq::from(0u64));
    }

    #[test]
    fn wrong_digest_fails() {
        let cs = ConstraintSystem::<Fq>::new_ref();
        let x = FpVar::new_witness(cs.clone(), || Ok(Fq::from(1u64))).unwrap();
        let digest = MimcGadget::<Fq, Fq, FpVar<Fq>>::hash(&[x]).unwrap();
        let wrong = Mimc::<Fq>::hash(&[Fq::from(2u64)]).unwrap();
        let wrong = FpVar::new_input(cs.clone(), || Ok(wrong)).unwrap();
        digest.enforce_equal(&wrong).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn emulated_matches_hasher() {
        run_profile_constraints(|| {
            let rng = &mut XorShiftRng::seed_from_u64(19);
            let element = Fr::rand(rng);
            let expected = Mimc::<Fr>::hash(&[element]).unwrap();

            let cs = ConstraintSystem::<Fq>::new_ref();
            let var = NonNativeFieldVar::<Fr, Fq>::new_witness(cs.clone(), || Ok(element)).unwrap();
            let digest = MimcGadget::<Fr, Fq, NonNativeFieldVar<Fr, Fq>>::hash(&[var]).unwrap();

            print_unsatisfied_constraints(cs.clone());
            assert!(cs.is_satisfied().unwrap());
            assert_eq!(digest.value().unwrap(), expected);
        });
    }
}
