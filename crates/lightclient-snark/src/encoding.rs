use crate::BWCurve;
use ark_bls12_377::Fq;
use ark_ec::short_weierstrass::{Affine, SWCurveConfig};
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::Proof;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, SerializationError};
use lightclient_crypto::{hashers::DIGEST_WIDTH, BLSError, PublicKey, Signature};
use num_bigint::BigUint;
use thiserror::Error;

/// Width of a big endian encoded BLS12-377 base field element
pub const FQ_WIDTH: usize = 48;

/// Width of an encoded signed message, two base field elements
pub const MESSAGE_WIDTH: usize = 2 * FQ_WIDTH;

/// Width of a BW6-761 base field coordinate in the EVM proof layout
pub const EVM_COORDINATE_WIDTH: usize = 96;

/// Width of the three proof points in the EVM proof layout
pub const EVM_PROOF_WIDTH: usize = 6 * EVM_COORDINATE_WIDTH;

#[derive(Debug, Error)]
/// Union type for data serialization errors
pub enum EncodingError {
    #[error("{field}: expected {expected} bytes, got {actual}")]
    WrongWidth {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{0}: not a canonical field element")]
    NonCanonical(&'static str),
    #[error("{0}: trailing bytes after the encoded value")]
    TrailingBytes(&'static str),
    #[error("Serialization Error: {0}")]
    Serialization(#[from] SerializationError),
    #[error("I/O Error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("BLS Error: {0}")]
    BLSError(#[from] BLSError),
}

fn check_width(field: &'static str, bytes: &[u8], expected: usize) -> Result<(), EncodingError> {
    if bytes.len() != expected {
        return Err(EncodingError::WrongWidth {
            field,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Decodes a big endian base field element, rejecting values which are not strictly less than
/// the modulus
pub fn decode_fq(field: &'static str, bytes: &[u8]) -> Result<Fq, EncodingError> {
    check_width(field, bytes, FQ_WIDTH)?;
    let value = BigUint::from_bytes_be(bytes);
    let modulus: BigUint = Fq::MODULUS.into();
    if value >= modulus {
        return Err(EncodingError::NonCanonical(field));
    }
    Ok(Fq::from(value))
}

/// Big endian encoding of a base field element
pub fn encode_fq(element: &Fq) -> [u8; FQ_WIDTH] {
    let mut out = [0u8; FQ_WIDTH];
    out.copy_from_slice(&element.into_bigint().to_bytes_be());
    out
}

/// Checks the width of a root or digest
pub fn decode_digest(
    field: &'static str,
    bytes: &[u8],
) -> Result<[u8; DIGEST_WIDTH], EncodingError> {
    check_width(field, bytes, DIGEST_WIDTH)?;
    let mut digest = [0u8; DIGEST_WIDTH];
    digest.copy_from_slice(bytes);
    Ok(digest)
}

/// Decodes the two field elements of a signed message
pub fn decode_message(bytes: &[u8]) -> Result<[Fq; 2], EncodingError> {
    check_width("message", bytes, MESSAGE_WIDTH)?;
    Ok([
        decode_fq("message[0]", &bytes[..FQ_WIDTH])?,
        decode_fq("message[1]", &bytes[FQ_WIDTH..])?,
    ])
}

pub fn encode_message(message: &[Fq; 2]) -> Vec<u8> {
    [encode_fq(&message[0]), encode_fq(&message[1])].concat()
}

/// Decodes a compressed G1 public key. Points off the curve or outside the prime order subgroup
/// are rejected.
pub fn decode_public_key(bytes: &[u8]) -> Result<PublicKey, EncodingError> {
    let mut reader = bytes;
    let key = PublicKey::deserialize_compressed(&mut reader)?;
    if !reader.is_empty() {
        return Err(EncodingError::TrailingBytes("public key"));
    }
    Ok(key)
}

pub fn encode_public_key(key: &PublicKey) -> Result<Vec<u8>, EncodingError> {
    let mut out = vec![];
    key.serialize_compressed(&mut out)?;
    Ok(out)
}

/// Decodes a compressed G2 signature
pub fn decode_signature(bytes: &[u8]) -> Result<Signature, EncodingError> {
    let mut reader = bytes;
    let signature = Signature::deserialize_compressed(&mut reader)?;
    if !reader.is_empty() {
        return Err(EncodingError::TrailingBytes("signature"));
    }
    Ok(signature)
}

pub fn encode_signature(signature: &Signature) -> Result<Vec<u8>, EncodingError> {
    let mut out = vec![];
    signature.serialize_compressed(&mut out)?;
    Ok(out)
}

/// A proof in each of the layouts it is handed out in
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedProof {
    /// arkworks compressed serialization
    pub compressed: Vec<u8>,
    /// arkworks uncompressed serialization
    pub uncompressed: Vec<u8>,
    /// `A.x || A.y || B.x || B.y || C.x || C.y`, each coordinate big endian, followed by the
    /// commitment bytes if any
    pub evm: Vec<u8>,
}

impl EncodedProof {
    pub fn new(proof: &Proof<BWCurve>) -> Result<Self, EncodingError> {
        let mut compressed = vec![];
        proof.serialize_compressed(&mut compressed)?;
        let mut uncompressed = vec![];
        proof.serialize_uncompressed(&mut uncompressed)?;
        Ok(Self {
            compressed,
            uncompressed,
            // Groth16 as implemented here carries no commitment to extra public inputs
            evm: encode_proof_evm(proof, &[]),
        })
    }
}

/// Both coordinates of `point`, each big endian and left padded to the EVM coordinate width.
/// The point at infinity is all zeros.
pub fn encode_point_evm<P: SWCurveConfig>(point: &Affine<P>) -> Vec<u8>
where
    P::BaseField: PrimeField,
{
    let mut out = Vec::with_capacity(2 * EVM_COORDINATE_WIDTH);
    for coordinate in [&point.x, &point.y] {
        let bytes = if point.infinity {
            vec![]
        } else {
            coordinate.into_bigint().to_bytes_be()
        };
        out.extend(std::iter::repeat(0u8).take(EVM_COORDINATE_WIDTH.saturating_sub(bytes.len())));
        out.extend_from_slice(&bytes);
    }
    out
}

/// Lays out the proof points for an external pairing based verifier, followed verbatim by
/// `commitment`
pub fn encode_proof_evm(proof: &Proof<BWCurve>, commitment: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(EVM_PROOF_WIDTH + commitment.len());
    out.extend(encode_point_evm(&proof.a));
    out.extend(encode_point_evm(&proof.b));
    out.extend(encode_point_evm(&proof.c));
    out.extend_from_slice(commitment);
    out
}

/// Decodes a proof from either of the arkworks serializations, told apart by their length
pub fn decode_proof(bytes: &[u8]) -> Result<Proof<BWCurve>, EncodingError> {
    let empty = Proof::<BWCurve>::default();
    let mut reader = bytes;
    let proof = if bytes.len() == empty.uncompressed_size() {
        Proof::deserialize_uncompressed(&mut reader)?
    } else if bytes.len() == empty.compressed_size() {
        Proof::deserialize_compressed(&mut reader)?
    } else {
        return Err(EncodingError::WrongWidth {
            field: "proof",
            expected: empty.compressed_size(),
            actual: bytes.len(),
        });
    };
    Ok(proof)
}
