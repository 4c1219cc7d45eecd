//! Variable-length integer encodings
//!
//! - LEB128 (protobuf varints)
//! - CompactSize (Bitcoin), delegated to `bitcoin::VarInt`

use crate::bitcoin::{consensus::Encodable, VarInt};
use crate::error::{Result, WasmWalletError};

pub fn write_leb128(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Returns the value and the number of bytes consumed
pub fn read_leb128(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut value = 0u64;
    for (i, byte) in bytes.iter().enumerate().take(10) {
        let chunk = (byte & 0x7f) as u64;
        if i == 9 && chunk > 1 {
            return Err(WasmWalletError::overflow("varint exceeds 64 bits"));
        }
        value |= chunk << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err("Truncated varint".into())
}

/// Bitcoin CompactSize
pub fn compact_size(value: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    // writing into a Vec cannot fail
    let _ = VarInt::from(value).consensus_encode(&mut out);
    out
}

pub fn compact_size_len(value: usize) -> usize {
    VarInt::from(value).size()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, &[0x00])]
    #[case(1, &[0x01])]
    #[case(150, &[0x96, 0x01])]
    #[case(300, &[0xac, 0x02])]
    fn test_leb128(#[case] value: u64, #[case] expected: &[u8]) {
        let mut out = Vec::new();
        write_leb128(&mut out, value);
        assert_eq!(out, expected);
        assert_eq!(read_leb128(&out).unwrap(), (value, expected.len()));
    }

    #[test]
    fn test_leb128_truncated() {
        assert!(read_leb128(&[0x80, 0x80]).is_err());
    }

    #[test]
    fn test_compact_size() {
        assert_eq!(compact_size(252), vec![0xfc]);
        assert_eq!(compact_size(253), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(compact_size_len(0x1_0000), 5);
    }
}
