use super::hint::{is_square, SqrtHint};
use crate::{BLSError, BlsResult, HashError};

use ark_ec::{
    short_weierstrass::{Affine, SWCurveConfig},
    AffineRepr, CurveGroup,
};
use ark_ff::{BigInteger, Field, One, PrimeField, Zero};

/// How many small integers are tried for the constant `Z`
const MAX_Z_CANDIDATES: u64 = 256;

/// Sign of a field element: the parity of its first non-zero base field component
pub fn sgn0<F: Field>(x: &F) -> bool {
    let mut sign = false;
    let mut zero = true;
    for component in x.to_base_prime_field_elements() {
        let sign_i = component.into_bigint().is_odd();
        sign = sign || (zero && sign_i);
        zero = zero && component.is_zero();
    }
    sign
}

/// Shallue-van de Woestijne map onto a short Weierstrass curve `y^2 = x^3 + Ax + B`, in the
/// straight-line form of RFC 9380 section 6.6.1, followed by cofactor clearing.
///
/// All constants depend only on the curve and are computed once.
#[derive(Clone, Debug)]
pub struct MapToCurve<P: SWCurveConfig> {
    z: P::BaseField,
    c1: P::BaseField,
    c2: P::BaseField,
    c3: P::BaseField,
    c4: P::BaseField,
    hint: SqrtHint<P::BaseField>,
}

impl<P: SWCurveConfig> MapToCurve<P> {
    /// Derives the map constants for the curve, failing if no suitable `Z` exists among the
    /// first candidates.
    pub fn new() -> Result<Self, HashError> {
        let two = P::BaseField::from(2u64);
        let four = P::BaseField::from(4u64);
        let z = Self::find_z().ok_or(HashError::NoSvdwConstant(MAX_Z_CANDIDATES))?;
        let gz = Self::curve_rhs(&z);
        let t = Self::three_z2_plus_4a(&z);

        let mut c3 = (-gz * t)
            .sqrt()
            .ok_or(HashError::NoSvdwConstant(MAX_Z_CANDIDATES))?;
        if sgn0(&c3) {
            c3 = -c3;
        }

        let map = MapToCurve {
            z,
            c1: gz,
            c2: -z / two,
            c3,
            c4: -(four * gz) / t,
            hint: SqrtHint::new()?,
        };
        log::trace!("svdw constants derived, Z = {}", z);
        Ok(map)
    }

    fn find_z() -> Option<P::BaseField> {
        let two = P::BaseField::from(2u64);
        let four = P::BaseField::from(4u64);
        for ctr in 1..=MAX_Z_CANDIDATES {
            for z in [P::BaseField::from(ctr), -P::BaseField::from(ctr)] {
                let gz = Self::curve_rhs(&z);
                let t = Self::three_z2_plus_4a(&z);
                if gz.is_zero() || t.is_zero() {
                    continue;
                }
                let h = -t / (four * gz);
                if !is_square(&h) {
                    continue;
                }
                if is_square(&gz) || is_square(&Self::curve_rhs(&(-z / two))) {
                    return Some(z);
                }
            }
        }
        None
    }

    fn three_z2_plus_4a(z: &P::BaseField) -> P::BaseField {
        P::BaseField::from(3u64) * z.square() + P::BaseField::from(4u64) * P::COEFF_A
    }

    /// `x^3 + Ax + B`
    pub fn curve_rhs(x: &P::BaseField) -> P::BaseField {
        x.square() * x + P::COEFF_A * x + P::COEFF_B
    }

    pub fn z(&self) -> P::BaseField {
        self.z
    }

    pub fn c1(&self) -> P::BaseField {
        self.c1
    }

    pub fn c2(&self) -> P::BaseField {
        self.c2
    }

    pub fn c3(&self) -> P::BaseField {
        self.c3
    }

    pub fn c4(&self) -> P::BaseField {
        self.c4
    }

    /// The square root oracle used for the residuosity tests
    pub fn hint(&self) -> &SqrtHint<P::BaseField> {
        &self.hint
    }

    /// Maps `u` to a point on the curve. The result is not in the prime order subgroup.
    pub fn map_to_curve(&self, u: &P::BaseField) -> BlsResult<Affine<P>> {
        let one = P::BaseField::one();
        let tv1 = u.square() * self.c1;
        let tv2 = one + tv1;
        let tv1 = one - tv1;
        let tv3 = (tv1 * tv2).inverse().unwrap_or_else(P::BaseField::zero);
        let tv4 = *u * tv1 * tv3 * self.c3;

        let x1 = self.c2 - tv4;
        let x2 = self.c2 + tv4;
        let x3 = (tv2.square() * tv3).square() * self.c4 + self.z;

        let x = if is_square(&Self::curve_rhs(&x1)) {
            x1
        } else if is_square(&Self::curve_rhs(&x2)) {
            x2
        } else {
            x3
        };

        let mut y = Self::curve_rhs(&x)
            .sqrt()
            .ok_or(BLSError::HashToCurveError)?;
        if sgn0(&y) != sgn0(u) {
            y = -y;
        }

        Ok(Affine::new_unchecked(x, y))
    }

    /// Maps `u` to the curve and clears the cofactor
    pub fn hash(&self, u: &P::BaseField) -> BlsResult<Affine<P>> {
        let point = self.map_to_curve(u)?;
        Ok(point.mul_bigint(P::COFACTOR).into_affine())
    }
}
