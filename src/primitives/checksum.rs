//! Checksums used by address and container formats

use crate::error::{Result, WasmWalletError};

const CRC32C_POLY: u32 = 0x82f6_3b78;
const CRC32_POLY: u32 = 0xedb8_8320;

fn crc32_reflected(poly: u32, data: &[u8]) -> u32 {
    let mut crc = !0u32;
    for byte in data {
        crc ^= *byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (poly & mask);
        }
    }
    !crc
}

/// CRC-32C (Castagnoli), used by TON bags of cells
pub fn crc32c(data: &[u8]) -> u32 {
    crc32_reflected(CRC32C_POLY, data)
}

/// CRC-32 (IEEE 802.3), used for TL-B schema ids
pub fn crc32(data: &[u8]) -> u32 {
    crc32_reflected(CRC32_POLY, data)
}

/// CRC-16/XMODEM, used by TON user-friendly addresses
pub fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Base58 with a 4-byte double-SHA256 checksum
pub fn base58check_decode(value: &str) -> Result<Vec<u8>> {
    bs58::decode(value)
        .with_check(None)
        .into_vec()
        .map_err(|e| WasmWalletError::Validation(format!("Invalid base58check: {}", e)))
}

pub fn base58check_encode(payload: &[u8]) -> String {
    bs58::encode(payload).with_check().into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_check_values() {
        // standard check input for all CRC catalogues
        let input = b"123456789";
        assert_eq!(crc32c(input), 0xe306_9283);
        assert_eq!(crc32(input), 0xcbf4_3926);
        assert_eq!(crc16_xmodem(input), 0x31c3);
    }

    #[test]
    fn test_base58check() {
        let payload = [0x41u8; 21];
        let encoded = base58check_encode(&payload);
        assert_eq!(base58check_decode(&encoded).unwrap(), payload.to_vec());

        let mut corrupted = encoded.into_bytes();
        let last = corrupted.len() - 1;
        corrupted[last] = if corrupted[last] == b'2' { b'3' } else { b'2' };
        let corrupted = String::from_utf8(corrupted).unwrap();
        assert!(base58check_decode(&corrupted).is_err());
    }
}
