//! EVM message conventions: EIP-191 personal messages, `eth_sign` and EIP-712

use super::message_bytes;
use crate::chain::ChainFamily;
use crate::error::{Result, WasmWalletError};
use crate::model::signing::{DigestAlgorithm, SignatureScheme, SigningPayload};
use crate::primitives::bytes::decode_hex;
use alloy_dyn_abi::TypedData;
use serde_json::Value;

pub const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";
const TYPED_DATA_PREFIX: [u8; 2] = [0x19, 0x01];
const DOMAIN_TYPE: &str = "EIP712Domain";

/// `prefix || decimal length || bytes`, shared with Tron's v2 messages
pub(crate) fn length_prefixed(prefix: &str, bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefix.len() + 8 + bytes.len());
    out.extend_from_slice(prefix.as_bytes());
    out.extend_from_slice(bytes.len().to_string().as_bytes());
    out.extend_from_slice(bytes);
    out
}

pub fn personal_sign(message: &str) -> Result<SigningPayload> {
    let bytes = message_bytes(message);
    Ok(SigningPayload::single(
        ChainFamily::Evm,
        length_prefixed(PERSONAL_MESSAGE_PREFIX, &bytes),
        DigestAlgorithm::Keccak256,
        SignatureScheme::Secp256k1Ecdsa,
    )
    .with_preview(String::from_utf8_lossy(&bytes).into_owned()))
}

/// The signer receives the 32-byte hash as is
pub fn eth_sign(message: &str) -> Result<SigningPayload> {
    let hash = decode_hex(message)?;
    if hash.len() != 32 {
        return Err(WasmWalletError::Validation(format!(
            "eth_sign expects a 32-byte hash, got {} bytes",
            hash.len()
        )));
    }
    Ok(SigningPayload::single(
        ChainFamily::Evm,
        hash,
        DigestAlgorithm::None,
        SignatureScheme::Secp256k1Ecdsa,
    )
    .with_preview(message.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedDataVersion {
    V3,
    V4,
}

/// `0x19 0x01 || domainSeparator || hashStruct(message)`; the message hash is
/// left out when the primary type is the domain itself
pub fn typed_data(message: &str, version: TypedDataVersion) -> Result<SigningPayload> {
    let value: Value = serde_json::from_str(message)?;
    if version == TypedDataVersion::V3 {
        reject_arrays(&value)?;
    }
    let typed: TypedData = serde_json::from_value(value)
        .map_err(|e| WasmWalletError::Validation(format!("Invalid typed data: {}", e)))?;

    let mut preimage = Vec::with_capacity(66);
    preimage.extend_from_slice(&TYPED_DATA_PREFIX);
    preimage.extend_from_slice(typed.domain.separator().as_slice());
    if typed.primary_type != DOMAIN_TYPE {
        let hash = typed
            .hash_struct()
            .map_err(|e| WasmWalletError::Validation(format!("Invalid typed data: {}", e)))?;
        preimage.extend_from_slice(hash.as_slice());
    }

    Ok(SigningPayload::single(
        ChainFamily::Evm,
        preimage,
        DigestAlgorithm::Keccak256,
        SignatureScheme::Secp256k1Ecdsa,
    )
    .with_preview(format!("Sign typed data {}", typed.primary_type)))
}

/// v3 predates array support
fn reject_arrays(value: &Value) -> Result<()> {
    let Some(types) = value.get("types").and_then(Value::as_object) else {
        return Ok(());
    };
    for (name, fields) in types {
        let Some(fields) = fields.as_array() else {
            continue;
        };
        for field in fields {
            if let Some(ty) = field.get("type").and_then(Value::as_str) {
                if ty.ends_with(']') {
                    return Err(WasmWalletError::InvalidFieldCombination(format!(
                        "typed data v3 does not support arrays ({}.{})",
                        name,
                        field.get("name").and_then(Value::as_str).unwrap_or("?")
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::signing::PayloadEntry;

    const MAIL: &str = r#"{
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "version", "type": "string"},
                {"name": "chainId", "type": "uint256"},
                {"name": "verifyingContract", "type": "address"}
            ],
            "Person": [
                {"name": "name", "type": "string"},
                {"name": "wallet", "type": "address"}
            ],
            "Mail": [
                {"name": "from", "type": "Person"},
                {"name": "to", "type": "Person"},
                {"name": "contents", "type": "string"}
            ]
        },
        "primaryType": "Mail",
        "domain": {
            "name": "Ether Mail",
            "version": "1",
            "chainId": 1,
            "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
        },
        "message": {
            "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
            "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
            "contents": "Hello, Bob!"
        }
    }"#;

    fn digest(payload: &SigningPayload) -> String {
        let entry: &PayloadEntry = &payload.entries[0];
        hex::encode(entry.message_digest())
    }

    #[test]
    fn test_personal_sign_prefix() {
        let payload = personal_sign("Hello World").unwrap();
        assert_eq!(
            payload.preimage().unwrap(),
            b"\x19Ethereum Signed Message:\n11Hello World"
        );
        assert_eq!(
            digest(&payload),
            "a1de988600a42c4b4ab089b619297c17d53cffae5d5120d82d8a92d0bb3b78f2"
        );
    }

    #[test]
    fn test_personal_sign_hex_message() {
        let payload = personal_sign("0xdead").unwrap();
        assert_eq!(
            payload.preimage().unwrap(),
            b"\x19Ethereum Signed Message:\n2\xde\xad"
        );
    }

    #[test]
    fn test_eth_sign_raw_hash() {
        let hash = format!("0x{}", "11".repeat(32));
        let payload = eth_sign(&hash).unwrap();
        assert_eq!(payload.preimage().unwrap(), &[0x11u8; 32]);
        assert_eq!(payload.entries[0].digest, DigestAlgorithm::None);
        assert!(eth_sign("0x1234").is_err());
    }

    #[test]
    fn test_typed_data_mail_example() {
        let payload = typed_data(MAIL, TypedDataVersion::V4).unwrap();
        assert_eq!(
            hex::encode(payload.preimage().unwrap()),
            concat!(
                "1901",
                "f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f",
                "c52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e"
            )
        );
        assert_eq!(
            digest(&payload),
            "be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
        );
        // no arrays, so v3 agrees
        assert_eq!(typed_data(MAIL, TypedDataVersion::V3).unwrap(), payload);
    }

    #[test]
    fn test_v3_rejects_arrays() {
        let with_array = MAIL.replace(
            r#"{"name": "to", "type": "Person"}"#,
            r#"{"name": "to", "type": "Person[]"}"#,
        );
        let err = typed_data(&with_array, TypedDataVersion::V3).unwrap_err();
        assert!(matches!(err, WasmWalletError::InvalidFieldCombination(_)));
    }
}
