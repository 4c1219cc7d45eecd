//! Tron addresses: base58check over `0x41 || hash160`

use crate::error::{Result, WasmWalletError};
use crate::primitives::bytes::strip_0x;
use crate::primitives::checksum::{base58check_decode, base58check_encode};

pub const ADDRESS_PREFIX: u8 = 0x41;
pub const ADDRESS_LEN: usize = 21;

/// Accepts base58 (`T...`) or the 21-byte hex form TronWeb uses in raw data
pub fn parse_address(address: &str) -> Result<[u8; ADDRESS_LEN]> {
    let bytes = if address.starts_with('T') {
        base58check_decode(address)?
    } else {
        hex::decode(strip_0x(address))
            .map_err(|_| WasmWalletError::Validation(format!("Invalid Tron address '{}'", address)))?
    };
    if bytes.len() != ADDRESS_LEN || bytes[0] != ADDRESS_PREFIX {
        return Err(WasmWalletError::Validation(format!(
            "Invalid Tron address '{}'",
            address
        )));
    }
    let mut out = [0u8; ADDRESS_LEN];
    out.copy_from_slice(&bytes);
    Ok(out)
}

pub fn encode_address(bytes: &[u8; ADDRESS_LEN]) -> String {
    base58check_encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("TPL66VK2gCXNCD7EJg9pgJRfqcRazjhUZY", "41928c9af0651632157ef27a2cf17ca72c575a4d21")]
    #[case("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t", "41a614f803b6fd780986a42c78ec9c7f77e6ded13c")]
    fn test_base58_and_hex(#[case] base58: &str, #[case] hex_form: &str) {
        let bytes = parse_address(base58).unwrap();
        assert_eq!(hex::encode(bytes), hex_form);
        assert_eq!(parse_address(hex_form).unwrap(), bytes);
        assert_eq!(encode_address(&bytes), base58);
    }

    #[rstest]
    #[case("TPL66VK2gCXNCD7EJg9pgJRfqcRazjhUZZ")]
    #[case("00928c9af0651632157ef27a2cf17ca72c575a4d21")]
    #[case("41928c9a")]
    fn test_invalid(#[case] address: &str) {
        assert!(parse_address(address).is_err());
    }
}
