use super::setup::Parameters;
use crate::{
    encoding::{encode_point_evm, EVM_COORDINATE_WIDTH},
    BWCurve,
};
use ark_groth16::VerifyingKey;
use ark_serialize::CanonicalSerialize;
use std::fmt::{self, Write};

/// Structural counts of a compiled circuit and the size of its keys
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CircuitStats {
    pub num_constraints: usize,
    /// Includes the constant one variable
    pub num_instance_variables: usize,
    pub num_witness_variables: usize,
    pub a_non_zero: usize,
    pub b_non_zero: usize,
    pub c_non_zero: usize,
    /// Compressed size in bytes
    pub proving_key_size: usize,
    /// Compressed size in bytes
    pub verifying_key_size: usize,
}

pub fn stats(parameters: &Parameters) -> CircuitStats {
    let m = &parameters.circuit.matrices;
    CircuitStats {
        num_constraints: m.num_constraints,
        num_instance_variables: m.num_instance_variables,
        num_witness_variables: m.num_witness_variables,
        a_non_zero: m.a_num_non_zero,
        b_non_zero: m.b_num_non_zero,
        c_non_zero: m.c_num_non_zero,
        proving_key_size: parameters.proving_key.compressed_size(),
        verifying_key_size: parameters.verifying_key().compressed_size(),
    }
}

fn write_point(out: &mut String, name: &str, encoded: &[u8]) -> fmt::Result {
    writeln!(
        out,
        "    bytes internal constant {} = hex\"{}\";",
        name,
        hex::encode(encoded)
    )
}

/// Renders a Solidity library holding the verifying key. Every point is laid out as in the
/// EVM proof encoding: both coordinates big endian, 96 bytes each, zeros for infinity.
pub fn export_verifier_source(vk: &VerifyingKey<BWCurve>) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "// SPDX-License-Identifier: Apache-2.0")?;
    writeln!(out, "pragma solidity ^0.8.0;")?;
    writeln!(out)?;
    writeln!(out, "/// Groth16 verifying key over BW6-761")?;
    writeln!(out, "library LightClientVerifyingKey {{")?;
    writeln!(
        out,
        "    uint256 internal constant COORDINATE_WIDTH = {};",
        EVM_COORDINATE_WIDTH
    )?;
    writeln!(
        out,
        "    uint256 internal constant NUM_PUBLIC_INPUTS = {};",
        vk.gamma_abc_g1.len().saturating_sub(1)
    )?;
    writeln!(out)?;
    write_point(&mut out, "ALPHA_G1", &encode_point_evm(&vk.alpha_g1))?;
    write_point(&mut out, "BETA_G2", &encode_point_evm(&vk.beta_g2))?;
    write_point(&mut out, "GAMMA_G2", &encode_point_evm(&vk.gamma_g2))?;
    write_point(&mut out, "DELTA_G2", &encode_point_evm(&vk.delta_g2))?;
    writeln!(out)?;
    writeln!(
        out,
        "    function ic(uint256 index) internal pure returns (bytes memory) {{"
    )?;
    for (i, point) in vk.gamma_abc_g1.iter().enumerate() {
        writeln!(
            out,
            "        if (index == {}) return hex\"{}\";",
            i,
            hex::encode(encode_point_evm(point))
        )?;
    }
    writeln!(out, "        revert(\"ic index out of range\");")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    Ok(out)
}
