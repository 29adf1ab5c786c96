use crate::HashError;
use ark_ff::{Field, One, Zero};

/// Largest candidate tried when searching for a quadratic non-residue
const MAX_NON_RESIDUE_CANDIDATES: u64 = 256;

/// Returns true if `x` is a square in its field (zero included)
pub fn is_square<F: Field>(x: &F) -> bool {
    x.is_zero() || x.legendre().is_qr()
}

/// Out of circuit square root oracle.
///
/// For an input `x` the oracle proposes `(is_square, root)` such that `root^2 == x` when `x` is a
/// square and `root^2 == x * N` otherwise, where `N` is a fixed non-residue. Both cases can be
/// checked with a single multiplication, so a circuit never has to trust the claimed bit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SqrtHint<F> {
    non_residue: F,
}

impl<F: Field> SqrtHint<F> {
    /// Picks the first non-residue of the form `k + u` (or `k` for prime fields)
    pub fn new() -> Result<Self, HashError> {
        let degree = F::extension_degree() as usize;
        for k in 1..=MAX_NON_RESIDUE_CANDIDATES {
            let mut elements = vec![F::BasePrimeField::zero(); degree];
            elements[0] = F::BasePrimeField::from(k);
            if degree > 1 {
                elements[1] = F::BasePrimeField::one();
            }
            if let Some(candidate) = F::from_base_prime_field_elems(&elements) {
                if !is_square(&candidate) {
                    return Ok(SqrtHint {
                        non_residue: candidate,
                    });
                }
            }
        }
        Err(HashError::NoSvdwConstant(MAX_NON_RESIDUE_CANDIDATES))
    }

    /// The non-residue `N`
    pub fn non_residue(&self) -> F {
        self.non_residue
    }

    /// Proposes `(is_square, root)` for `x`
    pub fn propose(&self, x: &F) -> (bool, F) {
        match x.sqrt() {
            Some(root) => (true, root),
            // x * N is a square whenever x is not
            None => (
                false,
                (*x * self.non_residue).sqrt().unwrap_or_else(F::zero),
            ),
        }
    }

    /// The relation a proposal must satisfy. Zero must always be claimed a square.
    pub fn check(&self, x: &F, is_square: bool, root: &F) -> bool {
        let target = if is_square {
            *x
        } else {
            *x * self.non_residue
        };
        root.square() == target && (is_square || !x.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bls12_377::{Fq, Fq2};
    use ark_ff::UniformRand;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    fn honest_proposals_check<F: Field>(rng: &mut XorShiftRng) {
        let hint = SqrtHint::<F>::new().unwrap();
        assert!(!is_square(&hint.non_residue()));
        let mut seen = [false; 2];
        for _ in 0..32 {
            let x = F::rand(rng);
            let (square, root) = hint.propose(&x);
            assert_eq!(square, is_square(&x));
            assert!(hint.check(&x, square, &root));
            // lying about the residuosity never checks out
            assert!(!hint.check(&x, !square, &root));
            seen[square as usize] = true;
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn base_field() {
        honest_proposals_check::<Fq>(&mut XorShiftRng::seed_from_u64(1));
    }

    #[test]
    fn quadratic_extension() {
        honest_proposals_check::<Fq2>(&mut XorShiftRng::seed_from_u64(2));
    }

    #[test]
    fn zero_is_square() {
        let hint = SqrtHint::<Fq2>::new().unwrap();
        assert_eq!(hint.propose(&Fq2::zero()), (true, Fq2::zero()));
        assert!(!hint.check(&Fq2::zero(), false, &Fq2::zero()));
    }
}
