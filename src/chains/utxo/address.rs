//! Address to output script conversion for bitcoin-like networks

use crate::bitcoin::ScriptBuf;
use crate::error::{Result, WasmWalletError};
use crate::primitives::checksum::base58check_decode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UtxoNetwork {
    #[default]
    Bitcoin,
    Testnet,
    Regtest,
    Litecoin,
    Dogecoin,
}

struct AddressParams {
    p2pkh: u8,
    p2sh: u8,
    hrp: Option<&'static str>,
}

impl UtxoNetwork {
    fn params(&self) -> AddressParams {
        match self {
            UtxoNetwork::Bitcoin => AddressParams {
                p2pkh: 0x00,
                p2sh: 0x05,
                hrp: Some("bc"),
            },
            UtxoNetwork::Testnet => AddressParams {
                p2pkh: 0x6f,
                p2sh: 0xc4,
                hrp: Some("tb"),
            },
            UtxoNetwork::Regtest => AddressParams {
                p2pkh: 0x6f,
                p2sh: 0xc4,
                hrp: Some("bcrt"),
            },
            UtxoNetwork::Litecoin => AddressParams {
                p2pkh: 0x30,
                p2sh: 0x32,
                hrp: Some("ltc"),
            },
            UtxoNetwork::Dogecoin => AddressParams {
                p2pkh: 0x1e,
                p2sh: 0x16,
                hrp: None,
            },
        }
    }

    pub fn supports_segwit(&self) -> bool {
        self.params().hrp.is_some()
    }
}

/// Convert an address string into its scriptPubKey for `network`
pub fn to_output_script(address: &str, network: UtxoNetwork) -> Result<ScriptBuf> {
    let params = network.params();

    if let Some(hrp) = params.hrp {
        let lower = address.to_ascii_lowercase();
        if lower.starts_with(&format!("{}1", hrp)) {
            let (decoded_hrp, version, program) = bech32::segwit::decode(address)
                .map_err(|e| WasmWalletError::Validation(format!("Invalid segwit address: {}", e)))?;
            if decoded_hrp.as_str() != hrp {
                return Err(format!("address {} is not for {:?}", address, network).into());
            }
            let version = version.to_u8();
            // OP_0 for v0, OP_1..OP_16 otherwise
            let opcode = if version == 0 { 0x00 } else { 0x50 + version };
            let mut script = Vec::with_capacity(program.len() + 2);
            script.push(opcode);
            script.push(program.len() as u8);
            script.extend_from_slice(&program);
            return Ok(ScriptBuf::from_bytes(script));
        }
    }

    let payload = base58check_decode(address)?;
    if payload.len() != 21 {
        return Err(format!("base58 address {} has wrong length", address).into());
    }
    let hash = &payload[1..];
    let script = if payload[0] == params.p2pkh {
        [&[0x76, 0xa9, 0x14][..], hash, &[0x88, 0xac]].concat()
    } else if payload[0] == params.p2sh {
        [&[0xa9, 0x14][..], hash, &[0x87]].concat()
    } else {
        return Err(format!(
            "address {} has version byte {:#04x}, not valid for {:?}",
            address, payload[0], network
        )
        .into());
    };
    Ok(ScriptBuf::from_bytes(script))
}
