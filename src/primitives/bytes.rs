//! Hex and base64 helpers

use crate::error::{Result, WasmWalletError};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;

pub fn strip_0x(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// Decode hex with an optional `0x` prefix
pub fn decode_hex(value: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(strip_0x(value.trim()))?)
}

/// Decode hex into a fixed-size array
pub fn decode_hex_array<const N: usize>(value: &str) -> Result<[u8; N]> {
    let bytes = decode_hex(value)?;
    to_array(&bytes)
}

pub fn to_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        WasmWalletError::Validation(format!("expected {} bytes, got {}", N, bytes.len()))
    })
}

pub fn encode_hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode base64 in either the standard or the url-safe alphabet, padded or not
pub fn decode_base64(value: &str) -> Result<Vec<u8>> {
    let trimmed = value.trim().trim_end_matches('=');
    let decoded = if trimmed.contains(['-', '_']) {
        URL_SAFE_NO_PAD.decode(trimmed)
    } else {
        STANDARD_NO_PAD.decode(trimmed)
    };
    decoded.map_err(|e| WasmWalletError::Validation(format!("Invalid base64: {}", e)))
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// dApps send byte fields either as hex or as base64; `0x` or an even-length
/// hex-only string is taken as hex
pub fn decode_hex_or_base64(value: &str) -> Result<Vec<u8>> {
    let value = value.trim();
    let looks_hex = value.starts_with("0x")
        || (value.len() % 2 == 0 && value.chars().all(|c| c.is_ascii_hexdigit()));
    if looks_hex {
        decode_hex(value)
    } else {
        decode_base64(value)
    }
}

/// Byte vectors carried as hex strings in JSON
pub mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(super::strip_0x(&s)).map_err(de::Error::custom)
    }
}

pub mod opt_hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| hex::decode(super::strip_0x(&s)).map_err(de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_prefix() {
        assert_eq!(decode_hex("0xdead").unwrap(), vec![0xde, 0xad]);
        assert_eq!(decode_hex("beef").unwrap(), vec![0xbe, 0xef]);
        assert!(decode_hex("0xabc").is_err());
    }

    #[test]
    fn test_decode_base64_variants() {
        let expected = vec![0xfb, 0xff, 0x01];
        assert_eq!(decode_base64("+/8B").unwrap(), expected);
        assert_eq!(decode_base64("-_8B").unwrap(), expected);
        assert_eq!(decode_base64("AQ==").unwrap(), vec![1]);
        assert_eq!(decode_base64("AQ").unwrap(), vec![1]);
    }

    #[test]
    fn test_hex_or_base64() {
        assert_eq!(decode_hex_or_base64("0a0b").unwrap(), vec![10, 11]);
        assert_eq!(decode_hex_or_base64("CgsM").unwrap(), vec![10, 11, 12]);
    }

    #[test]
    fn test_fixed_array_length() {
        assert!(decode_hex_array::<4>("00112233").is_ok());
        assert!(decode_hex_array::<4>("001122").is_err());
    }
}
