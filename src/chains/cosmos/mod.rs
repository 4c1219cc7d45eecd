//! Cosmos SDK transactions in Direct (protobuf) and legacy Amino JSON sign modes

use crate::chain::ChainFamily;
use crate::error::{Result, WasmWalletError};
use crate::model::signing::{
    expect_signature_len, expect_signatures, DigestAlgorithm, Encoder, SignatureScheme,
    SignedPayload, SigningPayload,
};
use crate::primitives::amount::u64_str;
use crate::primitives::bytes::{encode_base64, hex_bytes};
use crate::primitives::protobuf::ProtoWriter;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

const SECP256K1_PUBKEY_TYPE: &str = "tendermint/PubKeySecp256k1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Vec<Coin>,
    pub gas: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granter: Option<String>,
}

/// Amino message: a registered type name and its JSON value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AminoMsg {
    #[serde(rename = "type")]
    pub type_url: String,
    pub value: Value,
}

/// The legacy `StdSignDoc`; field names are the wire names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignDoc {
    pub chain_id: String,
    pub account_number: String,
    pub sequence: String,
    pub fee: StdFee,
    pub msgs: Vec<AminoMsg>,
    #[serde(default)]
    pub memo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_height: Option<String>,
}

#[derive(Serialize)]
struct PubKey {
    #[serde(rename = "type")]
    key_type: &'static str,
    value: String,
}

#[derive(Serialize)]
struct StdSignature {
    pub_key: PubKey,
    signature: String,
}

#[derive(Serialize)]
struct StdTx<'a> {
    msg: &'a [AminoMsg],
    fee: &'a StdFee,
    signatures: Vec<StdSignature>,
    memo: &'a str,
}

/// Canonical amino JSON: keys sorted at every level, no whitespace, and
/// `&`, `<`, `>` escaped as `\u00XX`
pub fn amino_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let sorted = sort_keys(serde_json::to_value(value)?);
    let json = serde_json::to_string(&sorted)?;
    Ok(json
        .replace('&', "\\u0026")
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .into_bytes())
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum CosmosTransaction {
    /// `SIGN_MODE_DIRECT` over already-encoded body and auth info
    #[serde(rename_all = "camelCase")]
    Direct {
        #[serde(with = "hex_bytes")]
        body_bytes: Vec<u8>,
        #[serde(with = "hex_bytes")]
        auth_info_bytes: Vec<u8>,
        chain_id: String,
        #[serde(with = "u64_str")]
        account_number: u64,
    },
    /// `SIGN_MODE_LEGACY_AMINO_JSON`
    #[serde(rename_all = "camelCase")]
    Amino {
        sign_doc: StdSignDoc,
        /// Compressed secp256k1 key placed in the StdTx signature
        #[serde(with = "hex_bytes")]
        public_key: Vec<u8>,
    },
}

impl CosmosTransaction {
    pub fn validate(&self) -> Result<()> {
        match self {
            CosmosTransaction::Direct {
                body_bytes,
                chain_id,
                ..
            } => {
                if body_bytes.is_empty() {
                    return Err("Cosmos direct sign doc has no body".into());
                }
                if chain_id.is_empty() {
                    return Err("Cosmos sign doc has no chain id".into());
                }
            }
            CosmosTransaction::Amino {
                sign_doc,
                public_key,
            } => {
                if sign_doc.chain_id.is_empty() {
                    return Err("Cosmos sign doc has no chain id".into());
                }
                if public_key.len() != 33 {
                    return Err(WasmWalletError::Validation(format!(
                        "public key must be 33 compressed bytes, got {}",
                        public_key.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Bytes the signer hashes with SHA-256
    pub fn sign_bytes(&self) -> Result<Vec<u8>> {
        self.validate()?;
        match self {
            CosmosTransaction::Direct {
                body_bytes,
                auth_info_bytes,
                chain_id,
                account_number,
            } => {
                let mut w = ProtoWriter::new();
                w.bytes(1, body_bytes)
                    .bytes(2, auth_info_bytes)
                    .string(3, chain_id)
                    .uint64(4, *account_number);
                Ok(w.finish())
            }
            CosmosTransaction::Amino { sign_doc, .. } => amino_json(sign_doc),
        }
    }

    fn preview(&self) -> String {
        match self {
            CosmosTransaction::Direct { chain_id, .. } => {
                format!("Sign transaction on {}", chain_id)
            }
            CosmosTransaction::Amino { sign_doc, .. } => {
                let types: Vec<&str> = sign_doc.msgs.iter().map(|m| m.type_url.as_str()).collect();
                format!("Sign {} on {}", types.join(", "), sign_doc.chain_id)
            }
        }
    }
}

impl Encoder for CosmosTransaction {
    fn chain(&self) -> ChainFamily {
        ChainFamily::Cosmos
    }

    fn build_signing_payload(&self) -> Result<SigningPayload> {
        let bytes = self.sign_bytes()?;
        tracing::debug!(len = bytes.len(), "built Cosmos sign bytes");
        Ok(SigningPayload::single(
            ChainFamily::Cosmos,
            bytes,
            DigestAlgorithm::Sha256,
            SignatureScheme::Secp256k1Ecdsa,
        )
        .with_preview(self.preview()))
    }

    /// Direct yields `TxRaw`; Amino yields the StdTx JSON handed back to the dApp
    fn assemble_signed_payload(&self, signatures: &[Vec<u8>]) -> Result<SignedPayload> {
        expect_signatures(signatures, 1)?;
        expect_signature_len(&signatures[0], &[64, 65])?;
        // r || s only; a trailing recovery byte is dropped
        let signature = &signatures[0][..64];
        self.validate()?;

        let raw = match self {
            CosmosTransaction::Direct {
                body_bytes,
                auth_info_bytes,
                ..
            } => {
                let mut w = ProtoWriter::new();
                w.bytes(1, body_bytes)
                    .bytes(2, auth_info_bytes)
                    .bytes(3, signature);
                w.finish()
            }
            CosmosTransaction::Amino {
                sign_doc,
                public_key,
            } => {
                let std_tx = StdTx {
                    msg: &sign_doc.msgs,
                    fee: &sign_doc.fee,
                    signatures: vec![StdSignature {
                        pub_key: PubKey {
                            key_type: SECP256K1_PUBKEY_TYPE,
                            value: encode_base64(public_key),
                        },
                        signature: encode_base64(signature),
                    }],
                    memo: &sign_doc.memo,
                };
                amino_json(&std_tx)?
            }
        };
        Ok(SignedPayload {
            chain: ChainFamily::Cosmos,
            txid: hex::encode_upper(Sha256::digest(&raw)),
            raw,
        })
    }
}
