use ark_ff::{BigInteger, PrimeField};
use ark_r1cs_std::{boolean::Boolean, eq::EqGadget, fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::SynthesisError;

/// Bits in each half of a digest
pub const LIMB_BITS: usize = 128;

/// Bits in a digest
pub const DIGEST_BITS: usize = 2 * LIMB_BITS;

/// Splits the canonical encoding of `element` into the `(hi, lo)` limbs of its digest, i.e.
/// bits `128..256` and `0..128` of its integer, as native field variables.
#[tracing::instrument(target = "r1cs", skip(element))]
pub fn digest_limbs_var<F, CF, V>(element: &V) -> Result<(FpVar<CF>, FpVar<CF>), SynthesisError>
where
    F: PrimeField,
    CF: PrimeField,
    V: FieldVar<F, CF>,
{
    let bits = element.to_bits_le()?;
    let lo = Boolean::le_bits_to_fp_var(&bits[..LIMB_BITS.min(bits.len())])?;
    let hi = if bits.len() > LIMB_BITS {
        Boolean::le_bits_to_fp_var(&bits[LIMB_BITS..DIGEST_BITS.min(bits.len())])?
    } else {
        FpVar::zero()
    };
    Ok((hi, lo))
}

/// Enforces that the digest of `element` has the limbs `(hi, lo)`
pub fn enforce_digest<F, CF, V>(
    element: &V,
    hi: &FpVar<CF>,
    lo: &FpVar<CF>,
) -> Result<(), SynthesisError>
where
    F: PrimeField,
    CF: PrimeField,
    V: FieldVar<F, CF>,
{
    let (element_hi, element_lo) = digest_limbs_var(element)?;
    element_hi.enforce_equal(hi)?;
    element_lo.enforce_equal(lo)
}

/// Allocates a variable of the (possibly emulated) field `F` holding the value of a native
/// 128-bit `limb`, and ties the two together through the canonical bit decomposition.
#[tracing::instrument(target = "r1cs", skip(limb))]
pub fn limb_to_field_var<F, CF, V>(limb: &FpVar<CF>) -> Result<V, SynthesisError>
where
    F: PrimeField,
    CF: PrimeField,
    V: FieldVar<F, CF>,
{
    let value = limb
        .value()
        .map(|v| F::from_le_bytes_mod_order(&v.into_bigint().to_bytes_le()));
    let element = if limb.is_constant() {
        V::constant(value?)
    } else {
        V::new_witness(limb.cs(), || value)?
    };

    let bits = element.to_bits_le()?;
    Boolean::le_bits_to_fp_var(&bits[..LIMB_BITS])?.enforce_equal(limb)?;
    for bit in &bits[LIMB_BITS..] {
        bit.enforce_equal(&Boolean::FALSE)?;
    }
    Ok(element)
}

/// For a fixed-capacity array of `capacity` slots of which the first `count` are in use, returns
/// the activity flag of each slot and enforces `count <= capacity`.
///
/// Slot `i` is active iff `count == j` for no `j <= i`.
#[tracing::instrument(target = "r1cs", skip(count))]
pub fn active_slots<CF: PrimeField>(
    count: &FpVar<CF>,
    capacity: usize,
) -> Result<Vec<Boolean<CF>>, SynthesisError> {
    let mut reached = Boolean::FALSE;
    let mut active = Vec::with_capacity(capacity);
    for i in 0..capacity {
        reached = reached.or(&count.is_eq(&FpVar::constant(CF::from(i as u64)))?)?;
        active.push(reached.not());
    }
    reached = reached.or(&count.is_eq(&FpVar::constant(CF::from(capacity as u64)))?)?;
    reached.enforce_equal(&Boolean::TRUE)?;
    Ok(active)
}

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use ark_ff::Field;
    use ark_relations::r1cs::{ConstraintLayer, ConstraintSystemRef, TracingMode};
    use tracing_subscriber::layer::SubscriberExt;

    /// Prints the first unsatisfied constraint, if any
    pub fn print_unsatisfied_constraints<F: Field>(cs: ConstraintSystemRef<F>) {
        if !cs.is_satisfied().unwrap() {
            println!("=========================================================");
            println!("Unsatisfied constraints:");
            println!("{}", cs.which_is_unsatisfied().unwrap().unwrap());
            println!("=========================================================");
        }
    }

    /// Runs `f` with a tracing layer that records the gadget namespaces constraints are
    /// created in, so unsatisfied constraints are reported with their trace.
    pub fn run_profile_constraints<T>(f: impl FnOnce() -> T) -> T {
        let layer = ConstraintLayer::new(TracingMode::OnlyConstraints);
        let subscriber = tracing_subscriber::Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, f)
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use super::*;
    use ark_bls12_377::{Fq, Fr};
    use ark_r1cs_std::fields::nonnative::NonNativeFieldVar;
    use ark_relations::r1cs::{ConstraintSystem, ConstraintSystemRef};
    use lightclient_crypto::hashers::{digest_limb_elements, to_digest};

    fn cs_active_slots(count: u64, capacity: usize) -> (ConstraintSystemRef<Fq>, Vec<bool>) {
        let cs = ConstraintSystem::<Fq>::new_ref();
        let count = FpVar::new_witness(cs.clone(), || Ok(Fq::from(count))).unwrap();
        let active = active_slots(&count, capacity).unwrap();
        let active = active.iter().map(|b| b.value().unwrap()).collect();
        (cs, active)
    }

    #[test]
    fn activity_follows_count() {
        run_profile_constraints(|| {
            for count in 0..=4u64 {
                let (cs, active) = cs_active_slots(count, 4);
                print_unsatisfied_constraints(cs.clone());
                assert!(cs.is_satisfied().unwrap());
                let expected = (0..4).map(|i| i < count).collect::<Vec<_>>();
                assert_eq!(active, expected);
            }
        });
    }

    #[test]
    fn count_above_capacity_fails() {
        let (cs, active) = cs_active_slots(5, 4);
        assert!(!cs.is_satisfied().unwrap());
        assert_eq!(active, vec![true; 4]);
    }

    #[test]
    fn native_digest_limbs_match() {
        let cs = ConstraintSystem::<Fq>::new_ref();
        let x = -Fq::from(3u64);
        let (hi, lo) = digest_limb_elements::<Fq>(&to_digest(&x));
        let x_var = FpVar::new_witness(cs.clone(), || Ok(x)).unwrap();
        let (hi_var, lo_var) = digest_limbs_var(&x_var).unwrap();
        assert_eq!(hi_var.value().unwrap(), hi);
        assert_eq!(lo_var.value().unwrap(), lo);
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn emulated_digest_limbs_match() {
        let cs = ConstraintSystem::<Fq>::new_ref();
        let x = -Fr::from(3u64);
        let (hi, lo) = digest_limb_elements::<Fq>(&to_digest(&x));
        let x_var = NonNativeFieldVar::<Fr, Fq>::new_witness(cs.clone(), || Ok(x)).unwrap();
        let hi_var = FpVar::new_input(cs.clone(), || Ok(hi)).unwrap();
        let lo_var = FpVar::new_input(cs.clone(), || Ok(lo)).unwrap();
        enforce_digest(&x_var, &hi_var, &lo_var).unwrap();
        assert!(cs.is_satisfied().unwrap());

        // an emulated limb round trips through its bits
        let limb: NonNativeFieldVar<Fr, Fq> = limb_to_field_var(&lo_var).unwrap();
        let (_, lo_again) = digest_limb_elements::<Fr>(&to_digest(&x));
        assert_eq!(limb.value().unwrap(), lo_again);
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn wrong_limb_fails() {
        let cs = ConstraintSystem::<Fq>::new_ref();
        let x = Fq::from(u64::MAX) * Fq::from(u64::MAX);
        let x_var = FpVar::new_witness(cs.clone(), || Ok(x)).unwrap();
        let hi = FpVar::new_input(cs.clone(), || Ok(Fq::from(0u64))).unwrap();
        let lo = FpVar::new_input(cs.clone(), || Ok(x + Fq::from(1u64))).unwrap();
        enforce_digest(&x_var, &hi, &lo).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }
}
