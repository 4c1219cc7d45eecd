//! SS58 addresses for Polkadot/Substrate chains
//!
//! See: https://docs.substrate.io/reference/address-formats/

use crate::error::{Result, WasmWalletError};
use blake2::{Blake2b512, Digest};

/// Checksum preimage prefix
const SS58_PREFIX: &[u8] = b"SS58PRE";

pub const POLKADOT_PREFIX: u16 = 0;
pub const KUSAMA_PREFIX: u16 = 2;
pub const SUBSTRATE_PREFIX: u16 = 42;

fn invalid(msg: impl std::fmt::Display) -> WasmWalletError {
    WasmWalletError::Validation(format!("Invalid SS58 address: {}", msg))
}

/// Encode a 32-byte account id under a network prefix
pub fn encode_ss58(public_key: &[u8], prefix: u16) -> Result<String> {
    if public_key.len() != 32 {
        return Err(invalid(format_args!(
            "public key must be 32 bytes, got {}",
            public_key.len()
        )));
    }

    let mut payload = encode_prefix(prefix)?;
    payload.extend_from_slice(public_key);
    let checksum = ss58_checksum(&payload);
    payload.extend_from_slice(&checksum[..2]);

    Ok(bs58::encode(&payload).into_string())
}

/// Decode an SS58 address into its account id and prefix
pub fn decode_ss58(address: &str) -> Result<([u8; 32], u16)> {
    let decoded = bs58::decode(address).into_vec().map_err(invalid)?;
    if decoded.len() < 35 {
        return Err(invalid("too short"));
    }

    let (prefix, prefix_len) = decode_prefix(&decoded)?;
    let checksum_start = decoded.len() - 2;
    let public_key: [u8; 32] = decoded[prefix_len..checksum_start]
        .try_into()
        .map_err(|_| invalid(format_args!("account id is {} bytes", checksum_start - prefix_len)))?;

    let expected = ss58_checksum(&decoded[..checksum_start]);
    if decoded[checksum_start..] != expected[..2] {
        return Err(invalid("checksum mismatch"));
    }

    Ok((public_key, prefix))
}

/// Single- and two-byte prefix forms
fn encode_prefix(prefix: u16) -> Result<Vec<u8>> {
    if prefix < 64 {
        Ok(vec![prefix as u8])
    } else if prefix < 16384 {
        let first = ((prefix & 0b0000_0000_1111_1100) as u8) >> 2 | 0b0100_0000;
        let second = ((prefix >> 8) as u8) | ((prefix & 0b0000_0000_0000_0011) as u8) << 6;
        Ok(vec![first, second])
    } else {
        Err(invalid(format_args!("prefix {} out of range", prefix)))
    }
}

fn decode_prefix(data: &[u8]) -> Result<(u16, usize)> {
    match data[0] {
        0..=63 => Ok((data[0] as u16, 1)),
        64..=127 => {
            let lower = (data[0] & 0b0011_1111) << 2 | (data[1] >> 6);
            let upper = data[1] & 0b0011_1111;
            Ok((((upper as u16) << 8) | (lower as u16), 2))
        }
        other => Err(invalid(format_args!("prefix byte {}", other))),
    }
}

fn ss58_checksum(payload: &[u8]) -> [u8; 64] {
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_PREFIX);
    hasher.update(payload);
    let mut checksum = [0u8; 64];
    checksum.copy_from_slice(&hasher.finalize());
    checksum
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ALICE_LIKE: &str = "61b18c6dc02ddcabdeac56cb4f21a971cc41cc97640f6f85b073480008c53a0d";

    #[test]
    fn test_substrate_vector() {
        let pubkey = hex::decode(ALICE_LIKE).unwrap();
        let address = encode_ss58(&pubkey, SUBSTRATE_PREFIX).unwrap();
        assert_eq!(address, "5EGoFA95omzemRssELLDjVenNZ68aXyUeqtKQScXSEBvVJkr");

        let (decoded, prefix) = decode_ss58(&address).unwrap();
        assert_eq!(decoded.to_vec(), pubkey);
        assert_eq!(prefix, SUBSTRATE_PREFIX);
    }

    #[rstest]
    #[case(POLKADOT_PREFIX)]
    #[case(KUSAMA_PREFIX)]
    #[case(2206)]
    fn test_prefix_roundtrip(#[case] prefix: u16) {
        let pubkey = hex::decode(ALICE_LIKE).unwrap();
        let address = encode_ss58(&pubkey, prefix).unwrap();
        let (decoded, decoded_prefix) = decode_ss58(&address).unwrap();
        assert_eq!(decoded.to_vec(), pubkey);
        assert_eq!(decoded_prefix, prefix);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(encode_ss58(&[0u8; 16], 42).is_err());
        assert!(decode_ss58("invalid").is_err());
        // flip the last character to break the checksum
        let mut address = "5EGoFA95omzemRssELLDjVenNZ68aXyUeqtKQScXSEBvVJkr".to_string();
        address.pop();
        address.push('s');
        assert!(decode_ss58(&address).is_err());
    }
}
