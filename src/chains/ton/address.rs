//! TON account addresses
//!
//! Raw form is `workchain:hex`. The user-friendly form is 36 bytes in base64 or
//! base64url: flags, workchain, account hash and a CRC16-XMODEM checksum.

use crate::error::{Result, WasmWalletError};
use crate::primitives::bytes::decode_base64;
use crate::primitives::checksum::crc16_xmodem;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use std::fmt;
use std::str::FromStr;

const BOUNCEABLE_TAG: u8 = 0x11;
const NON_BOUNCEABLE_TAG: u8 = 0x51;
const TESTNET_FLAG: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TonAddress {
    pub workchain: i32,
    pub hash: [u8; 32],
}

/// Flags carried by the user-friendly form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressFlags {
    pub bounceable: bool,
    pub testnet: bool,
}

fn invalid(address: &str, reason: &str) -> WasmWalletError {
    WasmWalletError::Validation(format!("Invalid TON address '{}': {}", address, reason))
}

impl TonAddress {
    /// Parse either form; flags are `None` for raw addresses
    pub fn parse(address: &str) -> Result<(TonAddress, Option<AddressFlags>)> {
        if address.contains(':') {
            Ok((Self::parse_raw(address)?, None))
        } else {
            let (parsed, flags) = Self::parse_friendly(address)?;
            Ok((parsed, Some(flags)))
        }
    }

    pub fn parse_raw(address: &str) -> Result<TonAddress> {
        let (workchain, hash) = address
            .split_once(':')
            .ok_or_else(|| invalid(address, "expected workchain:hash"))?;
        let workchain: i32 = workchain
            .parse()
            .map_err(|_| invalid(address, "bad workchain"))?;
        let hash: [u8; 32] = hex::decode(hash)
            .map_err(|_| invalid(address, "bad hash hex"))?
            .try_into()
            .map_err(|_| invalid(address, "hash must be 32 bytes"))?;
        Ok(TonAddress { workchain, hash })
    }

    pub fn parse_friendly(address: &str) -> Result<(TonAddress, AddressFlags)> {
        if address.len() != 48 {
            return Err(invalid(address, "expected 48 characters"));
        }
        let raw = decode_base64(address)?;
        if raw.len() != 36 {
            return Err(invalid(address, "expected 36 bytes"));
        }
        let checksum = u16::from_be_bytes([raw[34], raw[35]]);
        if crc16_xmodem(&raw[..34]) != checksum {
            return Err(invalid(address, "checksum mismatch"));
        }

        let testnet = raw[0] & TESTNET_FLAG != 0;
        let bounceable = match raw[0] & !TESTNET_FLAG {
            BOUNCEABLE_TAG => true,
            NON_BOUNCEABLE_TAG => false,
            _ => return Err(invalid(address, "unknown tag")),
        };
        let workchain = raw[1] as i8 as i32;
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&raw[2..34]);
        Ok((
            TonAddress { workchain, hash },
            AddressFlags {
                bounceable,
                testnet,
            },
        ))
    }

    pub fn to_raw_string(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    pub fn to_friendly(&self, flags: AddressFlags, url_safe: bool) -> String {
        let mut tag = if flags.bounceable {
            BOUNCEABLE_TAG
        } else {
            NON_BOUNCEABLE_TAG
        };
        if flags.testnet {
            tag |= TESTNET_FLAG;
        }
        let mut raw = Vec::with_capacity(36);
        raw.push(tag);
        raw.push(self.workchain as i8 as u8);
        raw.extend_from_slice(&self.hash);
        let checksum = crc16_xmodem(&raw);
        raw.extend_from_slice(&checksum.to_be_bytes());
        if url_safe {
            URL_SAFE.encode(raw)
        } else {
            STANDARD.encode(raw)
        }
    }
}

impl FromStr for TonAddress {
    type Err = WasmWalletError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self::parse(s)?.0)
    }
}

impl fmt::Display for TonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const RAW: &str = "0:ca6e321c7cce9ecedf0a8ca2492ec8592494aa5fb5ce0387dff96ef6af982a3e";

    #[rstest]
    #[case("EQDKbjIcfM6ezt8KjKJJLshZJJSqX7XOA4ff-W72r5gqPrHF", true, false)]
    #[case("UQDKbjIcfM6ezt8KjKJJLshZJJSqX7XOA4ff-W72r5gqPuwA", false, false)]
    #[case("kQDKbjIcfM6ezt8KjKJJLshZJJSqX7XOA4ff-W72r5gqPgpP", true, true)]
    fn test_friendly_forms(#[case] friendly: &str, #[case] bounceable: bool, #[case] testnet: bool) {
        let (address, flags) = TonAddress::parse_friendly(friendly).unwrap();
        assert_eq!(address.to_raw_string(), RAW);
        assert_eq!(flags, AddressFlags { bounceable, testnet });
        assert_eq!(address.to_friendly(flags, true), friendly);
    }

    #[test]
    fn test_masterchain_standard_alphabet() {
        let mut address = TonAddress::parse_raw(RAW).unwrap();
        address.workchain = -1;
        let flags = AddressFlags {
            bounceable: true,
            testnet: false,
        };
        let friendly = address.to_friendly(flags, false);
        assert_eq!(friendly, "Ef/KbjIcfM6ezt8KjKJJLshZJJSqX7XOA4ff+W72r5gqPk6N");
        assert_eq!(TonAddress::parse(&friendly).unwrap(), (address, Some(flags)));
    }

    #[test]
    fn test_raw_has_no_flags() {
        let (address, flags) = TonAddress::parse(RAW).unwrap();
        assert!(flags.is_none());
        assert_eq!(address.to_string(), RAW);
    }

    #[rstest]
    #[case("EQDKbjIcfM6ezt8KjKJJLshZJJSqX7XOA4ff-W72r5gqPrHG")]
    #[case("EQDKbjIcfM6ezt8KjKJJLshZJJSqX7XOA4ff")]
    #[case("0:zz")]
    #[case("x:ca6e321c7cce9ecedf0a8ca2492ec8592494aa5fb5ce0387dff96ef6af982a3e")]
    fn test_invalid(#[case] address: &str) {
        assert!(TonAddress::from_str(address).is_err());
    }
}
