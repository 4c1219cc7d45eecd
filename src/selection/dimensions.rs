//! Weight-based size estimation for fee calculation
//!
//! Input weights use the largest DER signature so fee estimates never fall short.

use crate::chains::utxo::ScriptType;
use crate::error::{Result, WasmWalletError};
use crate::primitives::varint::compact_size_len;

// DER signature with sighash byte, worst case
const ECDSA_SIG_MAX: usize = 73;
const SCHNORR_SIG: usize = 64;
const COMPRESSED_PUBKEY: usize = 33;
const OP_PUSH_SIZE: usize = 1;
// OP_0 <20-byte hash>
const P2WPKH_REDEEM_SCRIPT: usize = 22;

// version(4) + locktime(4)
const TX_FIXED_SIZE: usize = 8;
// marker + flag, counted at witness weight
const SEGWIT_MARKER_WEIGHT: usize = 2;

/// Compute the size of a length-prefixed slice (varint + data)
fn var_slice_size(length: usize) -> usize {
    compact_size_len(length) + length
}

fn vector_size(element_lengths: &[usize]) -> usize {
    compact_size_len(element_lengths.len())
        + element_lengths
            .iter()
            .map(|&len| var_slice_size(len))
            .sum::<usize>()
}

/// Input weight from scriptSig and witness element lengths
fn compute_input_weight(script_components: &[usize], witness_components: &[usize]) -> usize {
    let script_length: usize = script_components.iter().sum();
    // prevout(32) + index(4) + sequence(4) + scriptSig
    let base_size = 40 + var_slice_size(script_length);
    let witness_size = if witness_components.is_empty() {
        0
    } else {
        vector_size(witness_components)
    };
    4 * base_size + witness_size
}

pub fn input_weight(script_type: ScriptType) -> Result<usize> {
    Ok(match script_type {
        ScriptType::P2pkh => compute_input_weight(
            &[OP_PUSH_SIZE + ECDSA_SIG_MAX, OP_PUSH_SIZE + COMPRESSED_PUBKEY],
            &[],
        ),
        ScriptType::P2shP2wpkh => compute_input_weight(
            &[OP_PUSH_SIZE + P2WPKH_REDEEM_SCRIPT],
            &[ECDSA_SIG_MAX, COMPRESSED_PUBKEY],
        ),
        ScriptType::P2wpkh => compute_input_weight(&[], &[ECDSA_SIG_MAX, COMPRESSED_PUBKEY]),
        ScriptType::P2tr => compute_input_weight(&[], &[SCHNORR_SIG]),
        ScriptType::P2wsh => {
            return Err(WasmWalletError::unsupported(
                "cannot estimate P2WSH inputs without the witness script",
            ))
        }
    })
}

pub fn output_script_len(script_type: ScriptType) -> usize {
    match script_type {
        ScriptType::P2pkh => 25,
        ScriptType::P2shP2wpkh => 23,
        ScriptType::P2wpkh => 22,
        ScriptType::P2wsh | ScriptType::P2tr => 34,
    }
}

/// OP_RETURN followed by a single push of `data_len` bytes
pub fn op_return_script_len(data_len: usize) -> usize {
    let push_overhead = if data_len <= 75 { 1 } else { 2 };
    1 + push_overhead + data_len
}

pub fn output_weight(script_len: usize) -> usize {
    4 * (8 + var_slice_size(script_len))
}

/// Accumulated size of a transaction under construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dimensions {
    input_weight: usize,
    output_weight: usize,
    inputs: usize,
    outputs: usize,
    has_segwit: bool,
}

impl Dimensions {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_input(script_type: ScriptType) -> Result<Self> {
        Ok(Dimensions {
            input_weight: input_weight(script_type)?,
            inputs: 1,
            has_segwit: script_type.is_segwit(),
            ..Self::default()
        })
    }

    pub fn from_output_script_len(script_len: usize) -> Self {
        Dimensions {
            output_weight: output_weight(script_len),
            outputs: 1,
            ..Self::default()
        }
    }

    pub fn plus(&self, other: &Dimensions) -> Dimensions {
        Dimensions {
            input_weight: self.input_weight + other.input_weight,
            output_weight: self.output_weight + other.output_weight,
            inputs: self.inputs + other.inputs,
            outputs: self.outputs + other.outputs,
            has_segwit: self.has_segwit || other.has_segwit,
        }
    }

    fn overhead_weight(&self) -> usize {
        let base = TX_FIXED_SIZE + compact_size_len(self.inputs) + compact_size_len(self.outputs);
        4 * base
            + if self.has_segwit {
                SEGWIT_MARKER_WEIGHT
            } else {
                0
            }
    }

    pub fn weight(&self) -> usize {
        self.overhead_weight() + self.input_weight + self.output_weight
    }

    pub fn vsize(&self) -> u64 {
        self.weight().div_ceil(4) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ScriptType::P2pkh, 596)]
    #[case(ScriptType::P2shP2wpkh, 365)]
    #[case(ScriptType::P2wpkh, 273)]
    #[case(ScriptType::P2tr, 230)]
    fn test_input_weights(#[case] script_type: ScriptType, #[case] weight: usize) {
        assert_eq!(input_weight(script_type).unwrap(), weight);
    }

    #[test]
    fn test_one_in_one_out_p2wpkh() {
        let dims = Dimensions::from_input(ScriptType::P2wpkh)
            .unwrap()
            .plus(&Dimensions::from_output_script_len(output_script_len(
                ScriptType::P2wpkh,
            )));
        // 42 overhead + 273 input + 124 output
        assert_eq!(dims.weight(), 439);
        assert_eq!(dims.vsize(), 110);
    }

    #[test]
    fn test_legacy_has_no_marker() {
        let dims = Dimensions::from_input(ScriptType::P2pkh)
            .unwrap()
            .plus(&Dimensions::from_output_script_len(25));
        assert_eq!(dims.weight(), 40 + 596 + 136);
        assert_eq!(dims.vsize(), 193);
    }

    #[test]
    fn test_op_return_len() {
        assert_eq!(op_return_script_len(4), 6);
        assert_eq!(op_return_script_len(80), 83);
    }

    #[test]
    fn test_p2wsh_unsupported() {
        assert!(Dimensions::from_input(ScriptType::P2wsh).is_err());
    }
}
