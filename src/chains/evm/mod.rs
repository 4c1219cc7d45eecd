//! EVM transaction envelopes
//!
//! - **Legacy**: EIP-155 replay-protected, `rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0])`
//! - **EIP-2930**: `0x01 || rlp([...accessList])`
//! - **EIP-1559**: `0x02 || rlp([chainId, nonce, maxPriorityFee, maxFee, ...])`
//!
//! The transaction hash is the Keccak-256 of the raw bytes, type prefix included.

use crate::chain::ChainFamily;
use crate::error::{Result, WasmWalletError};
use crate::model::signing::{
    expect_signature_len, expect_signatures, DigestAlgorithm, Encoder, SignatureScheme,
    SignedPayload, SigningPayload,
};
use crate::primitives::amount::{u128_str, u256_str, u64_str};
use crate::primitives::bytes::encode_hex_prefixed;
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{BufMut, Encodable, Header};
use serde::{Deserialize, Serialize};

const EIP2930_TYPE: u8 = 0x01;
const EIP1559_TYPE: u8 = 0x02;
/// Largest chain id whose EIP-155 `v = recid + 35 + 2 * chainId` fits in a u64 (EIP-2294)
pub const MAX_CHAIN_ID: u64 = (u64::MAX - 36) / 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListItem {
    pub address: Address,
    #[serde(default)]
    pub storage_keys: Vec<B256>,
}

impl AccessListItem {
    fn payload_length(&self) -> usize {
        self.address.length() + self.storage_keys.length()
    }
}

impl Encodable for AccessListItem {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        self.address.encode(out);
        self.storage_keys.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        alloy_rlp::length_of_length(payload_length) + payload_length
    }
}

/// Fee fields, which also decide the envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EvmFee {
    #[serde(rename_all = "camelCase")]
    Legacy {
        #[serde(with = "u128_str")]
        gas_price: u128,
    },
    #[serde(rename_all = "camelCase")]
    Eip2930 {
        #[serde(with = "u128_str")]
        gas_price: u128,
        #[serde(default)]
        access_list: Vec<AccessListItem>,
    },
    #[serde(rename_all = "camelCase")]
    Eip1559 {
        #[serde(with = "u128_str")]
        max_fee_per_gas: u128,
        #[serde(with = "u128_str")]
        max_priority_fee_per_gas: u128,
        #[serde(default)]
        access_list: Vec<AccessListItem>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmTransaction {
    #[serde(with = "u64_str")]
    pub chain_id: u64,
    #[serde(with = "u64_str")]
    pub nonce: u64,
    #[serde(with = "u64_str")]
    pub gas_limit: u64,
    /// `None` deploys a contract
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default, with = "u256_str")]
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
    pub fee: EvmFee,
}

/// secp256k1 signature split into its RLP fields
struct RecoverableSignature {
    r: U256,
    s: U256,
    recovery_id: u8,
}

impl RecoverableSignature {
    /// `r || s || v` with `v` in {0, 1, 27, 28}
    fn parse(signature: &[u8]) -> Result<Self> {
        expect_signature_len(signature, &[65])?;
        let recovery_id = match signature[64] {
            v @ (0 | 1) => v,
            v @ (27 | 28) => v - 27,
            v => return Err(WasmWalletError::Validation(format!("invalid recovery byte {}", v))),
        };
        Ok(RecoverableSignature {
            r: U256::from_be_slice(&signature[..32]),
            s: U256::from_be_slice(&signature[32..64]),
            recovery_id,
        })
    }
}

fn rlp_list(fields: &[&dyn Encodable]) -> Vec<u8> {
    let payload_length: usize = fields.iter().map(|f| f.length()).sum();
    let mut out = Vec::with_capacity(payload_length + 9);
    Header {
        list: true,
        payload_length,
    }
    .encode(&mut out);
    for field in fields {
        field.encode(&mut out);
    }
    out
}

fn typed(tx_type: u8, body: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 1);
    out.push(tx_type);
    out.extend_from_slice(&body);
    out
}

impl EvmTransaction {
    pub fn validate(&self) -> Result<()> {
        if self.chain_id == 0 {
            return Err("chainId must be non-zero".into());
        }
        if self.chain_id > MAX_CHAIN_ID {
            return Err(format!("chainId {} exceeds {}", self.chain_id, MAX_CHAIN_ID).into());
        }
        if self.to.is_none() && self.data.is_empty() {
            return Err("contract creation needs init code".into());
        }
        if let EvmFee::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
            ..
        } = &self.fee
        {
            if max_priority_fee_per_gas > max_fee_per_gas {
                return Err(WasmWalletError::InvalidFieldCombination(
                    "maxPriorityFeePerGas exceeds maxFeePerGas".into(),
                ));
            }
        }
        Ok(())
    }

    /// Empty string for contract creation, otherwise the 20-byte address
    fn to_field(&self) -> Bytes {
        self.to
            .map(|address| Bytes::copy_from_slice(address.as_slice()))
            .unwrap_or_default()
    }

    /// Envelope bytes; `signature` appends v/yParity, r and s
    fn encode(&self, signature: Option<&RecoverableSignature>) -> Vec<u8> {
        let to = self.to_field();
        let parity = signature.map_or(0, |sig| sig.recovery_id);
        match &self.fee {
            EvmFee::Legacy { gas_price } => {
                let (v, r, s) = match signature {
                    Some(sig) => (
                        sig.recovery_id as u64 + 35 + 2 * self.chain_id,
                        sig.r,
                        sig.s,
                    ),
                    None => (self.chain_id, U256::ZERO, U256::ZERO),
                };
                rlp_list(&[
                    &self.nonce as &dyn Encodable,
                    gas_price,
                    &self.gas_limit,
                    &to,
                    &self.value,
                    &self.data,
                    &v,
                    &r,
                    &s,
                ])
            }
            EvmFee::Eip2930 {
                gas_price,
                access_list,
            } => {
                let mut fields: Vec<&dyn Encodable> = vec![
                    &self.chain_id as &dyn Encodable,
                    &self.nonce,
                    gas_price,
                    &self.gas_limit,
                    &to,
                    &self.value,
                    &self.data,
                    access_list,
                ];
                if let Some(sig) = signature {
                    fields.extend([&parity as &dyn Encodable, &sig.r, &sig.s]);
                }
                typed(EIP2930_TYPE, rlp_list(&fields))
            }
            EvmFee::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
                access_list,
            } => {
                let mut fields: Vec<&dyn Encodable> = vec![
                    &self.chain_id as &dyn Encodable,
                    &self.nonce,
                    max_priority_fee_per_gas,
                    max_fee_per_gas,
                    &self.gas_limit,
                    &to,
                    &self.value,
                    &self.data,
                    access_list,
                ];
                if let Some(sig) = signature {
                    fields.extend([&parity as &dyn Encodable, &sig.r, &sig.s]);
                }
                typed(EIP1559_TYPE, rlp_list(&fields))
            }
        }
    }

    fn preview(&self) -> String {
        match self.to {
            Some(to) if self.data.is_empty() => {
                format!("Send {} wei to {} on chain {}", self.value, to, self.chain_id)
            }
            Some(to) => format!(
                "Call {} with {} bytes and {} wei on chain {}",
                to,
                self.data.len(),
                self.value,
                self.chain_id
            ),
            None => format!("Deploy contract on chain {}", self.chain_id),
        }
    }
}

impl Encoder for EvmTransaction {
    fn chain(&self) -> ChainFamily {
        ChainFamily::Evm
    }

    fn build_signing_payload(&self) -> Result<SigningPayload> {
        self.validate()?;
        let payload = SigningPayload::single(
            ChainFamily::Evm,
            self.encode(None),
            DigestAlgorithm::Keccak256,
            SignatureScheme::Secp256k1Ecdsa,
        )
        .with_preview(self.preview());
        tracing::debug!(chain = "evm", chain_id = self.chain_id, "built signing payload");
        Ok(payload)
    }

    fn assemble_signed_payload(&self, signatures: &[Vec<u8>]) -> Result<SignedPayload> {
        self.validate()?;
        expect_signatures(signatures, 1)?;
        let signature = RecoverableSignature::parse(&signatures[0])?;
        let raw = self.encode(Some(&signature));
        let txid = encode_hex_prefixed(keccak256(&raw).as_slice());
        Ok(SignedPayload {
            chain: ChainFamily::Evm,
            raw,
            txid,
        })
    }
}
