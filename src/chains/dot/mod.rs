//! Substrate (Polkadot) extrinsics
//!
//! Calls are carried as opaque SCALE bytes or built from the balances pallet
//! indices in [`DotConfig`]; no runtime metadata is needed.

pub mod address;

pub use address::{decode_ss58, encode_ss58};

use crate::chain::ChainFamily;
use crate::config::DotConfig;
use crate::error::{Result, WasmWalletError};
use crate::model::signing::{
    expect_signature_len, expect_signatures, DigestAlgorithm, Encoder, SignatureScheme,
    SignedPayload, SigningPayload,
};
use crate::primitives::amount::u128_str;
use crate::primitives::bytes::{decode_hex_array, encode_hex_prefixed, hex_bytes};
use blake2::{digest::consts::U32, Blake2b, Digest};
use parity_scale_codec::{Compact, Decode, Encode};
use serde::{Deserialize, Serialize};

/// Signing payloads above this length are replaced by their Blake2-256 hash
const MAX_SIGNING_PAYLOAD: usize = 256;
/// Signed, extrinsic format version 4
const SIGNED_V4: u8 = 0x84;
const MULTI_ADDRESS_ID: u8 = 0x00;
const MULTI_SIGNATURE_ED25519: u8 = 0x00;

pub(crate) fn blake2_256(data: &[u8]) -> [u8; 32] {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&Blake2b::<U32>::digest(data));
    hash
}

/// Transaction era (mortal or immortal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Era {
    /// Valid forever; the reference block must be the genesis hash
    Immortal,
    Mortal { period: u32, phase: u32 },
}

impl Era {
    /// Mortal era starting at `current_block` and lasting about `period` blocks
    pub fn mortal(current_block: u64, period: u32) -> Era {
        let period = period.clamp(4, 1 << 16).next_power_of_two();
        let phase = (current_block % period as u64) as u32;
        let quantize_factor = (period >> 12).max(1);
        Era::Mortal {
            period,
            phase: phase / quantize_factor * quantize_factor,
        }
    }

    pub fn is_immortal(&self) -> bool {
        matches!(self, Era::Immortal)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        match *self {
            Era::Immortal => Ok(vec![0x00]),
            Era::Mortal { period, phase } => {
                if !period.is_power_of_two() || !(4..=1 << 16).contains(&period) || phase >= period {
                    return Err(WasmWalletError::Validation(format!(
                        "invalid mortal era: period {}, phase {}",
                        period, phase
                    )));
                }
                let quantize_factor = (period >> 12).max(1);
                let period_log = (period.trailing_zeros() - 1).clamp(1, 15);
                let encoded = (period_log | ((phase / quantize_factor) << 4)) as u16;
                Ok(encoded.to_le_bytes().to_vec())
            }
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<(Era, usize)> {
        match bytes {
            [] => Err("Empty era encoding".into()),
            [0x00, ..] => Ok((Era::Immortal, 1)),
            [lo, hi, ..] => {
                let encoded = u16::from_le_bytes([*lo, *hi]) as u32;
                let period = 2u32 << (encoded % 16);
                let quantize_factor = (period >> 12).max(1);
                let phase = (encoded >> 4) * quantize_factor;
                if period < 4 || phase >= period {
                    return Err("Invalid mortal era".into());
                }
                Ok((Era::Mortal { period, phase }, 2))
            }
            [_] => Err("Truncated mortal era".into()),
        }
    }
}

/// `Balances::transfer_*` with a `MultiAddress::Id` destination
#[derive(Encode)]
struct BalancesTransfer {
    pallet: u8,
    call: u8,
    dest_kind: u8,
    dest: [u8; 32],
    value: Compact<u128>,
}

/// `Balances::transfer_all`
#[derive(Encode)]
struct BalancesTransferAll {
    pallet: u8,
    call: u8,
    dest_kind: u8,
    dest: [u8; 32],
    keep_alive: bool,
}

/// Runtime facts that go into the signing payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    /// Chain genesis hash (e.g., "0x91b171bb158e2d...")
    pub genesis_hash: String,
    pub spec_version: u32,
    pub tx_version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DotCall {
    /// Pre-encoded call (pallet index, call index, arguments)
    #[serde(rename_all = "camelCase")]
    Raw {
        #[serde(with = "hex_bytes")]
        call_data: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    Transfer {
        to: String,
        #[serde(with = "u128_str")]
        amount: u128,
        #[serde(default)]
        keep_alive: bool,
    },
    #[serde(rename_all = "camelCase")]
    TransferAll {
        to: String,
        #[serde(default)]
        keep_alive: bool,
    },
}

impl DotCall {
    pub fn encode(&self, indices: &DotConfig) -> Result<Vec<u8>> {
        match self {
            DotCall::Raw { call_data } => {
                if call_data.len() < 2 {
                    return Err("call data must hold pallet and call indices".into());
                }
                Ok(call_data.clone())
            }
            DotCall::Transfer {
                to,
                amount,
                keep_alive,
            } => {
                let call_index = if *keep_alive {
                    indices.transfer_keep_alive
                } else {
                    indices.transfer_allow_death
                };
                Ok(BalancesTransfer {
                    pallet: indices.balances_pallet,
                    call: call_index,
                    dest_kind: MULTI_ADDRESS_ID,
                    dest: decode_ss58(to)?.0,
                    value: Compact(*amount),
                }
                .encode())
            }
            DotCall::TransferAll { to, keep_alive } => Ok(BalancesTransferAll {
                pallet: indices.balances_pallet,
                call: indices.transfer_all,
                dest_kind: MULTI_ADDRESS_ID,
                dest: decode_ss58(to)?.0,
                keep_alive: *keep_alive,
            }
            .encode()),
        }
    }

    fn preview(&self) -> String {
        match self {
            DotCall::Raw { call_data } => {
                format!("Call {}", encode_hex_prefixed(&call_data[..2.min(call_data.len())]))
            }
            DotCall::Transfer { to, amount, .. } => format!("Transfer {} planck to {}", amount, to),
            DotCall::TransferAll { to, .. } => format!("Transfer all to {}", to),
        }
    }
}

/// An unsigned extrinsic with everything needed to sign it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DotTransaction {
    /// SS58 address of the signing account
    pub sender: String,
    pub call: DotCall,
    pub era: Era,
    pub nonce: u32,
    #[serde(default, with = "u128_str")]
    pub tip: u128,
    pub material: Material,
    /// Block the era is anchored to; the genesis hash for immortal eras
    pub reference_block: String,
    #[serde(default)]
    pub indices: DotConfig,
}

impl DotTransaction {
    pub fn validate(&self) -> Result<()> {
        decode_ss58(&self.sender)?;
        self.era.encode()?;
        self.call.encode(&self.indices)?;
        decode_hex_array::<32>(&self.material.genesis_hash)?;
        decode_hex_array::<32>(&self.reference_block)?;
        if self.era.is_immortal() && self.reference_block != self.material.genesis_hash {
            return Err(WasmWalletError::InvalidFieldCombination(
                "immortal era must reference the genesis block".into(),
            ));
        }
        Ok(())
    }

    /// era, nonce and tip as they appear in both payload and extrinsic
    fn extra(&self) -> Result<Vec<u8>> {
        let mut extra = self.era.encode()?;
        Compact(self.nonce).encode_to(&mut extra);
        Compact(self.tip).encode_to(&mut extra);
        Ok(extra)
    }

    pub fn signing_bytes(&self) -> Result<Vec<u8>> {
        let mut payload = self.call.encode(&self.indices)?;
        payload.extend_from_slice(&self.extra()?);
        payload.extend_from_slice(&self.material.spec_version.to_le_bytes());
        payload.extend_from_slice(&self.material.tx_version.to_le_bytes());
        payload.extend_from_slice(&decode_hex_array::<32>(&self.material.genesis_hash)?);
        payload.extend_from_slice(&decode_hex_array::<32>(&self.reference_block)?);

        if payload.len() > MAX_SIGNING_PAYLOAD {
            Ok(blake2_256(&payload).to_vec())
        } else {
            Ok(payload)
        }
    }
}

impl Encoder for DotTransaction {
    fn chain(&self) -> ChainFamily {
        ChainFamily::Dot
    }

    fn build_signing_payload(&self) -> Result<SigningPayload> {
        self.validate()?;
        let payload = SigningPayload::single(
            ChainFamily::Dot,
            self.signing_bytes()?,
            DigestAlgorithm::None,
            SignatureScheme::Ed25519,
        )
        .with_preview(self.call.preview());
        tracing::debug!(chain = "dot", entries = 1, "built signing payload");
        Ok(payload)
    }

    fn assemble_signed_payload(&self, signatures: &[Vec<u8>]) -> Result<SignedPayload> {
        self.validate()?;
        expect_signatures(signatures, 1)?;
        expect_signature_len(&signatures[0], &[64])?;
        let (signer, _) = decode_ss58(&self.sender)?;

        let mut body = vec![SIGNED_V4, MULTI_ADDRESS_ID];
        body.extend_from_slice(&signer);
        body.push(MULTI_SIGNATURE_ED25519);
        body.extend_from_slice(&signatures[0]);
        body.extend_from_slice(&self.extra()?);
        body.extend_from_slice(&self.call.encode(&self.indices)?);

        let length = u32::try_from(body.len())
            .map_err(|_| WasmWalletError::overflow("extrinsic longer than u32::MAX bytes"))?;
        let mut raw = Compact(length).encode();
        raw.extend_from_slice(&body);
        let txid = encode_hex_prefixed(&blake2_256(&raw));
        Ok(SignedPayload {
            chain: ChainFamily::Dot,
            raw,
            txid,
        })
    }
}

/// A decoded signed extrinsic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedExtrinsic {
    pub signer: [u8; 32],
    pub signature: [u8; 64],
    pub era: Era,
    pub nonce: u32,
    pub tip: u128,
    pub call_data: Vec<u8>,
}

impl SignedExtrinsic {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut input = bytes;
        let length = Compact::<u32>::decode(&mut input)?.0;
        if input.len() != length as usize {
            return Err("extrinsic length prefix does not match".into());
        }

        if u8::decode(&mut input)? != SIGNED_V4 {
            return Err(WasmWalletError::unsupported("only signed v4 extrinsics are supported"));
        }
        if u8::decode(&mut input)? != MULTI_ADDRESS_ID {
            return Err(WasmWalletError::unsupported("signer is not a MultiAddress::Id"));
        }
        let signer = <[u8; 32]>::decode(&mut input)?;
        if u8::decode(&mut input)? != MULTI_SIGNATURE_ED25519 {
            return Err(WasmWalletError::unsupported("signature is not Ed25519"));
        }
        let signature = <[u8; 64]>::decode(&mut input)?;

        let (era, used) = Era::decode(input)?;
        input = &input[used..];
        let nonce = Compact::<u32>::decode(&mut input)?.0;
        let tip = Compact::<u128>::decode(&mut input)?.0;

        Ok(SignedExtrinsic {
            signer,
            signature,
            era,
            nonce,
            tip,
            call_data: input.to_vec(),
        })
    }
}
