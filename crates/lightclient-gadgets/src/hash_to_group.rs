use crate::SqrtHintGadget;
use ark_bls12_377::{
    constraints::{Fq2Var, G2Var},
    g2, Fq,
};
use ark_ec::short_weierstrass::SWCurveConfig;
use ark_ff::{BitIteratorBE, Field, PrimeField};
use ark_r1cs_std::{prelude::*, ToConstraintFieldGadget};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use lightclient_crypto::{hash_to_curve::g2_map, MapToCurve};
use std::marker::PhantomData;
use tracing::{debug, span, trace, Level};

/// In-circuit `sgn0`: the parity of the first non-zero base field component of `x`
pub fn sgn0<F, CF, FV>(x: &FV) -> Result<Boolean<CF>, SynthesisError>
where
    F: Field,
    CF: PrimeField,
    FV: FieldVar<F, CF> + ToConstraintFieldGadget<CF>,
{
    let mut sign = Boolean::FALSE;
    let mut zero = Boolean::TRUE;
    for component in x.to_constraint_field()? {
        let bits = component.to_bits_le()?;
        let sign_i = bits.first().cloned().unwrap_or(Boolean::FALSE);
        sign = sign.or(&zero.and(&sign_i)?)?;
        zero = zero.and(&component.is_zero()?)?;
    }
    Ok(sign)
}

/// Allocates a prover supplied value, or a constant if there is no constraint system
fn new_hint<F, CF, FV>(
    cs: ConstraintSystemRef<CF>,
    value: impl FnOnce() -> Result<F, SynthesisError>,
) -> Result<FV, SynthesisError>
where
    F: Field,
    CF: PrimeField,
    FV: FieldVar<F, CF>,
{
    if cs.is_none() {
        Ok(FV::constant(value()?))
    } else {
        FV::new_witness(cs, value)
    }
}

/// Gadget which enforces the Shallue-van de Woestijne map followed by cofactor clearing. For more
/// information on the map, refer to the [non-gadget implementation][map].
///
/// Square roots are supplied as hints and checked: the residuosity of the two candidate
/// `g(x)` values, the final `y` coordinate and the slopes of the cofactor multiplication.
///
/// [map]: ../lightclient_crypto/hash_to_curve/struct.MapToCurve.html
pub struct HashToGroupGadget<P, CF, FV> {
    parameters_type: PhantomData<P>,
    constraint_field_type: PhantomData<CF>,
    field_var_type: PhantomData<FV>,
}

impl<P, CF, FV> HashToGroupGadget<P, CF, FV>
where
    P: SWCurveConfig,
    CF: PrimeField,
    FV: FieldVar<P::BaseField, CF> + ToConstraintFieldGadget<CF>,
{
    /// Maps `u` to the prime order subgroup, returning affine coordinates
    #[tracing::instrument(target = "r1cs", skip(map, u))]
    pub fn hash(map: &MapToCurve<P>, u: &FV) -> Result<(FV, FV), SynthesisError> {
        let (x, y) = Self::map_to_curve(map, u)?;
        Self::clear_cofactor(&x, &y)
    }

    /// `x^3 + Ax + B`
    fn curve_rhs(x: &FV) -> Result<FV, SynthesisError> {
        Ok(x.square()? * x + x.clone() * P::COEFF_A + P::COEFF_B)
    }

    /// Inverse which maps zero to zero
    fn inv0(d: &FV) -> Result<FV, SynthesisError> {
        let is_zero = d.is_zero()?;
        let safe = is_zero.select(&FV::one(), d)?;
        is_zero.select(&FV::zero(), &safe.inverse()?)
    }

    /// Enforces the straight-line SvdW map of `u`. The point is on the curve but not
    /// necessarily in the prime order subgroup.
    #[tracing::instrument(target = "r1cs", skip(map, u))]
    pub fn map_to_curve(map: &MapToCurve<P>, u: &FV) -> Result<(FV, FV), SynthesisError> {
        let span = span!(Level::TRACE, "map_to_curve");
        let _enter = span.enter();

        let one = FV::one();
        let u2c1 = u.square()? * map.c1();
        let tv2 = one.clone() + &u2c1;
        let tv1 = one - &u2c1;
        let tv3 = Self::inv0(&(tv1.clone() * &tv2))?;
        let tv4 = u.clone() * &tv1 * &tv3 * map.c3();

        let x1 = FV::constant(map.c2()) - &tv4;
        let x2 = tv4 + map.c2();
        let x3 = (tv2.square()? * &tv3).square()? * map.c4() + map.z();

        trace!("checking the residuosity of the candidates");
        let (e1, _) =
            SqrtHintGadget::<_, CF, FV>::propose_and_check(map.hint(), &Self::curve_rhs(&x1)?)?;
        let (e2, _) =
            SqrtHintGadget::<_, CF, FV>::propose_and_check(map.hint(), &Self::curve_rhs(&x2)?)?;
        let x = e1.select(&x1, &e2.select(&x2, &x3)?)?;

        let y: FV = new_hint(u.cs(), || {
            let point = map
                .map_to_curve(&u.value()?)
                .map_err(|_| SynthesisError::Unsatisfiable)?;
            Ok(point.y)
        })?;
        y.square()?.enforce_equal(&Self::curve_rhs(&x)?)?;
        sgn0(&y)?.enforce_equal(&sgn0(u)?)?;

        Ok((x, y))
    }

    /// Multiplies an affine point by the curve's cofactor with double-and-add over its bits.
    ///
    /// The formulas are incomplete: every intermediate sum must be of two distinct points, none
    /// of them the identity. This holds for points of order at least the subgroup order, i.e.
    /// anything the map produces outside of negligible cases, and is enforced.
    #[tracing::instrument(target = "r1cs", skip(x, y))]
    pub fn clear_cofactor(x: &FV, y: &FV) -> Result<(FV, FV), SynthesisError> {
        let mut bits = BitIteratorBE::without_leading_zeros(P::COFACTOR);
        // the leading one sets the accumulator to the point itself
        if bits.next().is_none() {
            return Err(SynthesisError::Unsatisfiable);
        }

        let (mut acc_x, mut acc_y) = (x.clone(), y.clone());
        for bit in bits {
            (acc_x, acc_y) = Self::double(&acc_x, &acc_y)?;
            if bit {
                (acc_x, acc_y) = Self::add(&acc_x, &acc_y, x, y)?;
            }
        }
        debug!("cofactor cleared");
        Ok((acc_x, acc_y))
    }

    fn double(x: &FV, y: &FV) -> Result<(FV, FV), SynthesisError> {
        let three = P::BaseField::from(3u64);
        let lambda: FV = new_hint(x.cs().or(y.cs()), || {
            let (x, y) = (x.value()?, y.value()?);
            let numerator = x.square() * three + P::COEFF_A;
            let denominator = y.double();
            denominator
                .inverse()
                .map(|inv| numerator * inv)
                .ok_or(SynthesisError::DivisionByZero)
        })?;
        let numerator = x.square()? * three + P::COEFF_A;
        lambda.mul_equals(&y.double()?, &numerator)?;

        let x3 = lambda.square()? - &x.double()?;
        let y3 = lambda * &(x.clone() - &x3) - y;
        Ok((x3, y3))
    }

    fn add(x1: &FV, y1: &FV, x2: &FV, y2: &FV) -> Result<(FV, FV), SynthesisError> {
        let denominator = x2.clone() - x1;
        let numerator = y2.clone() - y1;
        denominator.enforce_not_equal(&FV::zero())?;

        let lambda: FV = new_hint(denominator.cs(), || {
            let (denominator, numerator) = (denominator.value()?, numerator.value()?);
            denominator
                .inverse()
                .map(|inv| numerator * inv)
                .ok_or(SynthesisError::DivisionByZero)
        })?;
        lambda.mul_equals(&denominator, &numerator)?;

        let x3 = lambda.square()? - x1 - x2;
        let y3 = lambda * &(x1.clone() - &x3) - y1;
        Ok((x3, y3))
    }
}

// On BLS12-377 the map lands directly in the G2 gadget used for pairings
impl HashToGroupGadget<g2::Config, Fq, Fq2Var> {
    /// Returns the G2 constrained hash of `u`
    #[tracing::instrument(target = "r1cs", skip(u))]
    pub fn enforce_hash_to_g2(u: &Fq2Var) -> Result<G2Var, SynthesisError> {
        let map = g2_map().map_err(|e| {
            tracing::error!("hash to curve parameters: {}", e);
            SynthesisError::Unsatisfiable
        })?;
        let (x, y) = Self::hash(map, u)?;
        Ok(G2Var::new(x, y, Fq2Var::one()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_helpers::{print_unsatisfied_constraints, run_profile_constraints};
    use ark_bls12_377::Fq2;
    use ark_ec::{AffineRepr, CurveConfig, CurveGroup};
    use ark_ff::{One, UniformRand, Zero};
    use ark_r1cs_std::fields::fp::FpVar;
    use ark_relations::r1cs::ConstraintSystem;
    use lightclient_crypto::hash_to_curve::sgn0 as native_sgn0;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    type G2Hasher = HashToGroupGadget<g2::Config, Fq, Fq2Var>;

    #[test]
    fn matches_native_hash() {
        run_profile_constraints(|| {
            let rng = &mut XorShiftRng::seed_from_u64(31);
            let map = g2_map().unwrap();
            for _ in 0..3 {
                let u = Fq2::rand(rng);
                let expected = map.hash(&u).unwrap();

                let cs = ConstraintSystem::<Fq>::new_ref();
                let u_var = Fq2Var::new_witness(cs.clone(), || Ok(u)).unwrap();
                let hash = G2Hasher::enforce_hash_to_g2(&u_var).unwrap();

                print_unsatisfied_constraints(cs.clone());
                assert!(cs.is_satisfied().unwrap());
                assert_eq!(hash.value().unwrap().into_affine(), expected);
            }
        });
    }

    #[test]
    fn map_matches_native() {
        let rng = &mut XorShiftRng::seed_from_u64(37);
        let map = g2_map().unwrap();
        let u = Fq2::rand(rng);
        let expected = map.map_to_curve(&u).unwrap();

        let cs = ConstraintSystem::<Fq>::new_ref();
        let u_var = Fq2Var::new_witness(cs.clone(), || Ok(u)).unwrap();
        let (x, y) = G2Hasher::map_to_curve(map, &u_var).unwrap();
        assert!(cs.is_satisfied().unwrap());
        assert_eq!((x.value().unwrap(), y.value().unwrap()), (expected.x, expected.y));
    }

    #[test]
    fn cofactor_clearing_matches_native() {
        let rng = &mut XorShiftRng::seed_from_u64(41);
        let map = g2_map().unwrap();
        let point = map.map_to_curve(&Fq2::rand(rng)).unwrap();
        let cleared = point.mul_bigint(g2::Config::COFACTOR).into_affine();

        let cs = ConstraintSystem::<Fq>::new_ref();
        let x = Fq2Var::new_witness(cs.clone(), || Ok(point.x)).unwrap();
        let y = Fq2Var::new_witness(cs.clone(), || Ok(point.y)).unwrap();
        let (cx, cy) = G2Hasher::clear_cofactor(&x, &y).unwrap();
        assert!(cs.is_satisfied().unwrap());
        assert_eq!((cx.value().unwrap(), cy.value().unwrap()), (cleared.x, cleared.y));
    }

    #[test]
    fn doubling_the_identity_fails() {
        // (x, 0) has no tangent slope
        let cs = ConstraintSystem::<Fq>::new_ref();
        let x = Fq2Var::new_witness(cs.clone(), || Ok(Fq2::one())).unwrap();
        let y = Fq2Var::new_witness(cs.clone(), || Ok(Fq2::zero())).unwrap();
        assert!(G2Hasher::clear_cofactor(&x, &y).is_err() || !cs.is_satisfied().unwrap());
    }

    #[test]
    fn negated_y_fails_sign_check() {
        let rng = &mut XorShiftRng::seed_from_u64(43);
        let map = g2_map().unwrap();
        let u = Fq2::rand(rng);
        let point = map.map_to_curve(&u).unwrap();

        // a y of the wrong sign passes the curve equation but not the sign check
        let cs = ConstraintSystem::<Fq>::new_ref();
        let u_var = Fq2Var::new_witness(cs.clone(), || Ok(u)).unwrap();
        let y = Fq2Var::new_witness(cs.clone(), || Ok(-point.y)).unwrap();
        sgn0(&y).unwrap().enforce_equal(&sgn0(&u_var).unwrap()).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn sgn0_matches_native() {
        let rng = &mut XorShiftRng::seed_from_u64(47);
        let cs = ConstraintSystem::<Fq>::new_ref();
        let mut values = (0..8).map(|_| Fq2::rand(rng)).collect::<Vec<_>>();
        values.push(Fq2::zero());
        values.push(Fq2::new(Fq::zero(), Fq::one()));
        values.push(Fq2::new(Fq::zero(), -Fq::one()));
        for value in values {
            let var = Fq2Var::new_witness(cs.clone(), || Ok(value)).unwrap();
            assert_eq!(sgn0(&var).unwrap().value().unwrap(), native_sgn0(&value));
        }
        let fp = FpVar::new_witness(cs.clone(), || Ok(Fq::from(3u64))).unwrap();
        assert!(sgn0(&fp).unwrap().value().unwrap());
        assert!(cs.is_satisfied().unwrap());
    }
}
