//! Tron transactions
//!
//! `raw_data` is written by hand in protobuf; the signed transaction is
//! `Transaction { raw_data = 1, signature = 2 }` with a 65-byte recoverable signature.

pub mod address;

use crate::chain::ChainFamily;
use crate::config::TronConfig;
use crate::error::{Result, WasmWalletError};
use crate::model::signing::{
    expect_signature_len, expect_signatures, DigestAlgorithm, Encoder, SignatureScheme,
    SignedPayload, SigningPayload,
};
use crate::primitives::amount::{opt_u64_str, u256_str, u64_str};
use crate::primitives::bytes::{decode_hex, hex_bytes};
use crate::primitives::protobuf::ProtoWriter;
use address::{parse_address, ADDRESS_LEN};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use address::encode_address;

const TYPE_URL_PREFIX: &str = "type.googleapis.com/protocol.";
/// `transfer(address,uint256)`
pub const TRC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Block the transaction is anchored to (TaPoS)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefBlock {
    /// From a block header: number and 32-byte block id
    #[serde(rename_all = "camelCase")]
    Header {
        #[serde(with = "u64_str")]
        number: u64,
        #[serde(with = "hex_bytes")]
        id: Vec<u8>,
    },
    /// The two fields as they appear in `raw_data`
    #[serde(rename_all = "camelCase")]
    Raw {
        #[serde(with = "hex_bytes")]
        ref_block_bytes: Vec<u8>,
        #[serde(with = "hex_bytes")]
        ref_block_hash: Vec<u8>,
    },
}

impl RefBlock {
    /// `(ref_block_bytes, ref_block_hash)`
    pub fn fields(&self) -> Result<([u8; 2], [u8; 8])> {
        match self {
            RefBlock::Header { number, id } => {
                if id.len() != 32 {
                    return Err("Tron block id must be 32 bytes".into());
                }
                let number = number.to_be_bytes();
                let mut hash = [0u8; 8];
                hash.copy_from_slice(&id[8..16]);
                Ok(([number[6], number[7]], hash))
            }
            RefBlock::Raw {
                ref_block_bytes,
                ref_block_hash,
            } => {
                let bytes = ref_block_bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| WasmWalletError::from("ref_block_bytes must be 2 bytes"))?;
                let hash = ref_block_hash
                    .as_slice()
                    .try_into()
                    .map_err(|_| WasmWalletError::from("ref_block_hash must be 8 bytes"))?;
                Ok((bytes, hash))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TronContract {
    /// Native TRX transfer, amount in sun
    #[serde(rename_all = "camelCase")]
    Transfer {
        owner: String,
        to: String,
        #[serde(with = "u64_str")]
        amount: u64,
    },
    #[serde(rename_all = "camelCase")]
    TriggerSmartContract {
        owner: String,
        contract: String,
        #[serde(default, with = "u64_str")]
        call_value: u64,
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
    },
    /// TRC-20 `transfer`, encoded as a smart contract call
    #[serde(rename_all = "camelCase")]
    Trc20Transfer {
        owner: String,
        contract: String,
        to: String,
        #[serde(with = "u256_str")]
        amount: U256,
    },
}

impl TronContract {
    fn type_name(&self) -> &'static str {
        match self {
            TronContract::Transfer { .. } => "TransferContract",
            TronContract::TriggerSmartContract { .. } | TronContract::Trc20Transfer { .. } => {
                "TriggerSmartContract"
            }
        }
    }

    /// `Transaction.Contract.ContractType`
    fn type_id(&self) -> u64 {
        match self {
            TronContract::Transfer { .. } => 1,
            TronContract::TriggerSmartContract { .. } | TronContract::Trc20Transfer { .. } => 31,
        }
    }

    pub fn is_smart_contract(&self) -> bool {
        self.type_id() == 31
    }

    fn parameter(&self) -> Result<ProtoWriter> {
        let mut w = ProtoWriter::new();
        match self {
            TronContract::Transfer { owner, to, amount } => {
                w.bytes(1, &parse_address(owner)?)
                    .bytes(2, &parse_address(to)?)
                    .uint64(3, *amount);
            }
            TronContract::TriggerSmartContract {
                owner,
                contract,
                call_value,
                data,
            } => {
                w.bytes(1, &parse_address(owner)?)
                    .bytes(2, &parse_address(contract)?)
                    .uint64(3, *call_value)
                    .bytes(4, data);
            }
            TronContract::Trc20Transfer {
                owner,
                contract,
                to,
                amount,
            } => {
                let data = trc20_transfer_data(&parse_address(to)?, *amount);
                w.bytes(1, &parse_address(owner)?)
                    .bytes(2, &parse_address(contract)?)
                    .bytes(4, &data);
            }
        }
        Ok(w)
    }

    fn encode(&self) -> Result<ProtoWriter> {
        let mut any = ProtoWriter::new();
        any.string(1, &format!("{}{}", TYPE_URL_PREFIX, self.type_name()))
            .message(2, &self.parameter()?);
        let mut contract = ProtoWriter::new();
        contract.uint64(1, self.type_id()).message(2, &any);
        Ok(contract)
    }

    fn preview(&self) -> String {
        match self {
            TronContract::Transfer { to, amount, .. } => format!("Send {} sun to {}", amount, to),
            TronContract::TriggerSmartContract { contract, .. } => {
                format!("Call contract {}", contract)
            }
            TronContract::Trc20Transfer {
                contract, to, amount, ..
            } => format!("Transfer {} of token {} to {}", amount, contract, to),
        }
    }
}

/// ABI call data for `transfer(address,uint256)`; the address drops its 0x41 prefix
pub fn trc20_transfer_data(to: &[u8; ADDRESS_LEN], amount: U256) -> Vec<u8> {
    let mut data = Vec::with_capacity(68);
    data.extend_from_slice(&TRC20_TRANSFER_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(&to[1..]);
    data.extend_from_slice(&amount.to_be_bytes::<32>());
    data
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TronTransaction {
    pub contract: TronContract,
    pub ref_block: RefBlock,
    /// Unix milliseconds; defaults to `timestamp + expiration window`
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_u64_str")]
    pub expiration: Option<u64>,
    /// Unix milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_u64_str")]
    pub timestamp: Option<u64>,
    /// sun; only meaningful for smart contract calls
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_u64_str")]
    pub fee_limit: Option<u64>,
    /// `raw_data.data`, a memo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl TronTransaction {
    /// Fill timestamp, expiration and the contract fee limit. An expiration
    /// past `u64::MAX` stays unset and fails validation.
    pub fn resolve(mut self, now_ms: u64, config: &TronConfig) -> Self {
        let timestamp = *self.timestamp.get_or_insert(now_ms);
        if self.expiration.is_none() {
            self.expiration = timestamp.checked_add(config.expiration_ms);
        }
        if self.fee_limit.is_none() && self.contract.is_smart_contract() {
            self.fee_limit = Some(config.default_fee_limit);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let (Some(timestamp), Some(expiration)) = (self.timestamp, self.expiration) else {
            return Err(
                "Tron transaction timestamp and expiration are unresolved or out of range".into(),
            );
        };
        if expiration <= timestamp {
            return Err(WasmWalletError::InvalidFieldCombination(format!(
                "expiration {} is not after timestamp {}",
                expiration, timestamp
            )));
        }
        self.ref_block.fields()?;
        Ok(())
    }

    /// Serialized `raw_data`
    pub fn raw_data(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let (ref_block_bytes, ref_block_hash) = self.ref_block.fields()?;
        let mut w = ProtoWriter::new();
        w.bytes(1, &ref_block_bytes)
            .bytes(4, &ref_block_hash)
            .uint64(8, self.expiration.unwrap_or_default());
        if let Some(memo) = &self.memo {
            w.string(10, memo);
        }
        w.message(11, &self.contract.encode()?)
            .uint64(14, self.timestamp.unwrap_or_default())
            .uint64(18, self.fee_limit.unwrap_or_default());
        Ok(w.finish())
    }

    pub fn txid(&self) -> Result<String> {
        Ok(hex::encode(Sha256::digest(self.raw_data()?)))
    }
}

impl Encoder for TronTransaction {
    fn chain(&self) -> ChainFamily {
        ChainFamily::Tron
    }

    fn build_signing_payload(&self) -> Result<SigningPayload> {
        let raw = self.raw_data()?;
        tracing::debug!(contract = self.contract.type_name(), "built Tron raw_data");
        Ok(SigningPayload::single(
            ChainFamily::Tron,
            raw,
            DigestAlgorithm::Sha256,
            SignatureScheme::Secp256k1Ecdsa,
        )
        .with_preview(self.contract.preview()))
    }

    fn assemble_signed_payload(&self, signatures: &[Vec<u8>]) -> Result<SignedPayload> {
        expect_signatures(signatures, 1)?;
        expect_signature_len(&signatures[0], &[65])?;
        let raw_data = self.raw_data()?;
        let mut tx = ProtoWriter::new();
        tx.bytes(1, &raw_data).bytes(2, &signatures[0]);
        Ok(SignedPayload {
            chain: ChainFamily::Tron,
            raw: tx.finish(),
            txid: hex::encode(Sha256::digest(&raw_data)),
        })
    }
}

/// Compare a dApp-supplied `raw_data_hex` with our own encoding
pub fn check_raw_data_hex(tx: &TronTransaction, raw_data_hex: &str) -> Result<()> {
    let expected = decode_hex(raw_data_hex)?;
    if tx.raw_data()? != expected {
        return Err(WasmWalletError::InvalidFieldCombination(
            "raw_data_hex does not match the transaction fields".to_string(),
        ));
    }
    Ok(())
}
