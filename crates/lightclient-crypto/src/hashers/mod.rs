mod mimc;
pub use mimc::{Mimc, MimcField, MimcParameters};

use ark_ff::{BigInteger, PrimeField};

/// Width in bytes of every root / digest exchanged with the outside world
pub const DIGEST_WIDTH: usize = 32;

/// Width in bytes of each of the two limbs a digest is split into
pub const LIMB_WIDTH: usize = DIGEST_WIDTH / 2;

/// First word hashed into a state tree leaf
pub const LEAF_PREFIX: u64 = 0;

/// First word hashed into a state tree inner node
pub const INNER_PREFIX: u64 = 1;

/// Encodes a hash output as a fixed-width digest: the low 256 bits of its canonical
/// integer, big endian. Lossless for fields of at most 256 bits.
pub fn to_digest<F: PrimeField>(element: &F) -> [u8; DIGEST_WIDTH] {
    let bytes = element.into_bigint().to_bytes_le();
    let mut digest = [0u8; DIGEST_WIDTH];
    for (i, b) in bytes.iter().take(DIGEST_WIDTH).enumerate() {
        digest[DIGEST_WIDTH - 1 - i] = *b;
    }
    digest
}

/// Splits a digest into its `(hi, lo)` half-width limbs
pub fn digest_limbs(digest: &[u8; DIGEST_WIDTH]) -> (u128, u128) {
    let mut hi = [0u8; LIMB_WIDTH];
    let mut lo = [0u8; LIMB_WIDTH];
    hi.copy_from_slice(&digest[..LIMB_WIDTH]);
    lo.copy_from_slice(&digest[LIMB_WIDTH..]);
    (u128::from_be_bytes(hi), u128::from_be_bytes(lo))
}

/// Returns the `(hi, lo)` limbs of a digest as elements of `F`
pub fn digest_limb_elements<F: PrimeField>(digest: &[u8; DIGEST_WIDTH]) -> (F, F) {
    let (hi, lo) = digest_limbs(digest);
    (F::from(hi), F::from(lo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bls12_377::{Fq, Fr};
    use ark_ff::{Field, One, Zero};

    #[test]
    fn digest_is_big_endian_low_bits() {
        let digest = to_digest(&Fr::from(0x0102u64));
        assert_eq!(digest[DIGEST_WIDTH - 1], 0x02);
        assert_eq!(digest[DIGEST_WIDTH - 2], 0x01);
        assert!(digest[..DIGEST_WIDTH - 2].iter().all(|b| *b == 0));
    }

    #[test]
    fn limbs_recombine() {
        let x = -Fr::one();
        let (hi, lo) = digest_limb_elements::<Fr>(&to_digest(&x));
        let shift = Fr::from(u128::MAX) + Fr::one();
        assert_eq!(hi * shift + lo, x);
    }

    #[test]
    fn wide_elements_are_truncated() {
        // 2^256 has no bits in the low 256
        let two_pow_256 = (0..256).fold(Fq::one(), |acc, _| acc.double());
        assert_eq!(to_digest(&two_pow_256), to_digest(&Fq::zero()));
    }
}
