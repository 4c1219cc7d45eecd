//! Unsigned messages
//!
//! A message is `{ kind, message, payload }`. The kind decides which payload
//! family is legal; [`UnsignedMessage::validate`] enforces that.

use crate::chain::ChainFamily;
use crate::error::{Result, WasmWalletError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    /// EIP-191 `personal_sign`
    PersonalSign,
    /// `eth_sign` over a raw 32-byte hash
    EthSign,
    TypedDataV3,
    TypedDataV4,
    /// BIP-137 "Bitcoin Signed Message"
    BtcEcdsa,
    Bip322Simple,
    TronSignMessageV2,
    SolOffchain,
    /// Legacy TON Connect `signData` over a schema-tagged cell
    TonSignData,
    TonSignDataV1,
    TonSignProof,
    /// ADR-36 arbitrary data signing
    CosmosAdr36,
    /// Plain UTF-8 bytes, no chain convention
    SignMessage,
}

impl MessageKind {
    /// Family whose payload shape this kind requires; `None` means the common payload
    pub fn family(&self) -> Option<ChainFamily> {
        match self {
            MessageKind::PersonalSign
            | MessageKind::EthSign
            | MessageKind::TypedDataV3
            | MessageKind::TypedDataV4 => Some(ChainFamily::Evm),
            MessageKind::BtcEcdsa | MessageKind::Bip322Simple => Some(ChainFamily::Btc),
            MessageKind::TronSignMessageV2 => Some(ChainFamily::Tron),
            MessageKind::SolOffchain => Some(ChainFamily::Sol),
            MessageKind::TonSignData | MessageKind::TonSignDataV1 | MessageKind::TonSignProof => {
                Some(ChainFamily::Ton)
            }
            MessageKind::CosmosAdr36 => Some(ChainFamily::Cosmos),
            MessageKind::SignMessage => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BtcSigOptions {
    /// BIP-137 header without the script-type offset (Electrum style)
    #[serde(default)]
    pub no_script_type: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BtcMessagePayload {
    #[serde(default)]
    pub sig_options: BtcSigOptions,
    #[serde(default, rename = "isFromDApp")]
    pub is_from_dapp: bool,
    /// Signing address; BIP-322 commits to its scriptPubKey
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Data being signed through TON Connect `signData`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TonSignDataPayload {
    Text { text: String },
    /// base64 bytes
    Binary { bytes: String },
    /// base64 BoC with the TL-B schema describing it
    Cell {
        #[serde(default)]
        schema: String,
        cell: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TonMessagePayload {
    #[serde(default)]
    pub is_proof: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_crc: Option<u32>,
    pub timestamp: Option<u64>,
    pub app_domain: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<TonSignDataPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolMessagePayload {
    #[serde(default)]
    pub version: u8,
    pub application_domain: String,
    /// base58 public key of the signer
    pub signer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CosmosMessagePayload {
    pub signer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum MessagePayload {
    Evm,
    Btc(BtcMessagePayload),
    Ton(TonMessagePayload),
    Sol(SolMessagePayload),
    Tron,
    Cosmos(CosmosMessagePayload),
    /// Chain-agnostic bytes; `chain` picks the signature scheme
    Common {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chain: Option<ChainFamily>,
    },
}

impl MessagePayload {
    pub fn family(&self) -> Option<ChainFamily> {
        match self {
            MessagePayload::Evm => Some(ChainFamily::Evm),
            MessagePayload::Btc(_) => Some(ChainFamily::Btc),
            MessagePayload::Ton(_) => Some(ChainFamily::Ton),
            MessagePayload::Sol(_) => Some(ChainFamily::Sol),
            MessagePayload::Tron => Some(ChainFamily::Tron),
            MessagePayload::Cosmos(_) => Some(ChainFamily::Cosmos),
            MessagePayload::Common { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub message: String,
    pub payload: MessagePayload,
}

impl UnsignedMessage {
    /// Construct and validate in one step
    pub fn new(kind: MessageKind, message: impl Into<String>, payload: MessagePayload) -> Result<Self> {
        let msg = UnsignedMessage {
            kind,
            message: message.into(),
            payload,
        };
        msg.validate()?;
        Ok(msg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.kind.family() != self.payload.family() {
            return Err(WasmWalletError::InvalidFieldCombination(format!(
                "message type {:?} cannot carry a {} payload",
                self.kind,
                self.payload
                    .family()
                    .map(|f| f.as_str())
                    .unwrap_or("common")
            )));
        }

        match (&self.kind, &self.payload) {
            (MessageKind::Bip322Simple, MessagePayload::Btc(btc)) if btc.address.is_none() => {
                Err("BIP-322 signing requires the signer address".into())
            }
            (kind, MessagePayload::Ton(ton)) => validate_ton(*kind, ton),
            (_, MessagePayload::Sol(sol)) if sol.signer.is_empty() => {
                Err("Solana off-chain message requires a signer".into())
            }
            (_, MessagePayload::Cosmos(cosmos)) if cosmos.signer.is_empty() => {
                Err("ADR-36 signing requires a signer".into())
            }
            (_, MessagePayload::Common { chain: None }) => {
                Err("common message signing requires a chain".into())
            }
            _ => Ok(()),
        }
    }
}

fn validate_ton(kind: MessageKind, ton: &TonMessagePayload) -> Result<()> {
    if ton.timestamp.is_none() {
        return Err("TON message signing requires a timestamp".into());
    }
    if ton.address.is_empty() {
        return Err("TON message signing requires an address".into());
    }
    match kind {
        MessageKind::TonSignProof => {
            if !ton.is_proof {
                return Err(WasmWalletError::InvalidFieldCombination(
                    "tonSignProof requires isProof".to_string(),
                ));
            }
            if ton.app_domain.is_empty() {
                return Err("TON proof requires an app domain".into());
            }
            Ok(())
        }
        MessageKind::TonSignData => {
            if ton.is_proof {
                return Err(WasmWalletError::InvalidFieldCombination(
                    "signData cannot be a proof".to_string(),
                ));
            }
            match (&ton.schema_crc, &ton.payload) {
                (Some(_), Some(TonSignDataPayload::Cell { .. })) => Ok(()),
                _ => Err(WasmWalletError::InvalidFieldCombination(
                    "legacy signData requires schemaCrc and a cell payload".to_string(),
                )),
            }
        }
        MessageKind::TonSignDataV1 => {
            if ton.is_proof {
                return Err(WasmWalletError::InvalidFieldCombination(
                    "signData cannot be a proof".to_string(),
                ));
            }
            if ton.payload.is_none() {
                return Err("signData requires a payload".into());
            }
            if ton.app_domain.is_empty() {
                return Err("signData requires an app domain".into());
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ton_payload(timestamp: Option<u64>) -> MessagePayload {
        MessagePayload::Ton(TonMessagePayload {
            is_proof: true,
            schema_crc: None,
            timestamp,
            app_domain: "ton.org".to_string(),
            address: "0:00".to_string(),
            payload: None,
        })
    }

    #[test]
    fn test_mismatched_family_rejected() {
        let err = UnsignedMessage::new(MessageKind::PersonalSign, "hi", ton_payload(Some(1)))
            .unwrap_err();
        assert!(matches!(err, WasmWalletError::InvalidFieldCombination(_)));
    }

    #[test]
    fn test_ton_requires_timestamp() {
        let err =
            UnsignedMessage::new(MessageKind::TonSignProof, "payload", ton_payload(None)).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: TON message signing requires a timestamp");
        assert!(UnsignedMessage::new(MessageKind::TonSignProof, "payload", ton_payload(Some(1))).is_ok());
    }

    #[test]
    fn test_bip322_requires_address() {
        let payload = MessagePayload::Btc(BtcMessagePayload {
            sig_options: BtcSigOptions::default(),
            is_from_dapp: true,
            address: None,
        });
        assert!(UnsignedMessage::new(MessageKind::Bip322Simple, "hi", payload.clone()).is_err());
        assert!(UnsignedMessage::new(MessageKind::BtcEcdsa, "hi", payload).is_ok());
    }

    #[test]
    fn test_common_payload_only_for_sign_message() {
        let common = MessagePayload::Common {
            chain: Some(ChainFamily::Sol),
        };
        assert!(UnsignedMessage::new(MessageKind::SignMessage, "hi", common).is_ok());
        assert!(UnsignedMessage::new(MessageKind::SignMessage, "hi", MessagePayload::Evm).is_err());
        assert!(
            UnsignedMessage::new(MessageKind::SignMessage, "hi", MessagePayload::Common { chain: None })
                .is_err()
        );
    }

    #[test]
    fn test_deserialize_shape() {
        let msg: UnsignedMessage = serde_json::from_str(
            r#"{"type":"btcEcdsa","message":"hello","payload":{"family":"btc","sigOptions":{"noScriptType":true},"isFromDApp":false}}"#,
        )
        .unwrap();
        assert_eq!(msg.kind, MessageKind::BtcEcdsa);
        match msg.payload {
            MessagePayload::Btc(btc) => assert!(btc.sig_options.no_script_type),
            other => panic!("unexpected payload {:?}", other),
        }
    }
}
