//! Solana off-chain message signing (header version 0)

use crate::chain::ChainFamily;
use crate::error::{Result, WasmWalletError};
use crate::model::message::SolMessagePayload;
use crate::model::signing::{DigestAlgorithm, SignatureScheme, SigningPayload};
use crate::primitives::bytes::to_array;

pub const SIGNING_DOMAIN: &[u8] = b"\xffsolana offchain";
/// Largest message a Ledger can display (formats 0 and 1)
const MAX_LEDGER_LEN: usize = 1212;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageFormat {
    RestrictedAscii = 0,
    LimitedUtf8 = 1,
    ExtendedUtf8 = 2,
}

impl MessageFormat {
    fn detect(message: &[u8]) -> Self {
        if message.len() > MAX_LEDGER_LEN {
            MessageFormat::ExtendedUtf8
        } else if message.iter().all(|b| (0x20..=0x7e).contains(b)) {
            MessageFormat::RestrictedAscii
        } else {
            MessageFormat::LimitedUtf8
        }
    }
}

/// A 32-byte base58 key is used as is, anything else is UTF-8 padded with zeros
fn application_domain(domain: &str) -> Result<[u8; 32]> {
    if let Ok(decoded) = bs58::decode(domain).into_vec() {
        if decoded.len() == 32 {
            return to_array(&decoded);
        }
    }
    let bytes = domain.as_bytes();
    if bytes.len() > 32 {
        return Err(WasmWalletError::Validation(format!(
            "application domain '{}' exceeds 32 bytes",
            domain
        )));
    }
    let mut out = [0u8; 32];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

fn signer_key(signer: &str) -> Result<[u8; 32]> {
    let decoded = bs58::decode(signer)
        .into_vec()
        .map_err(|e| WasmWalletError::Validation(format!("Invalid signer '{}': {}", signer, e)))?;
    to_array(&decoded)
}

pub fn offchain_message(message: &str, payload: &SolMessagePayload) -> Result<SigningPayload> {
    if payload.version != 0 {
        return Err(WasmWalletError::unsupported(format!(
            "off-chain message version {}",
            payload.version
        )));
    }
    let body = message.as_bytes();
    let len = u16::try_from(body.len())
        .map_err(|_| WasmWalletError::Validation("off-chain message too long".to_string()))?;

    let mut preimage = Vec::with_capacity(SIGNING_DOMAIN.len() + 69 + body.len());
    preimage.extend_from_slice(SIGNING_DOMAIN);
    preimage.push(payload.version);
    preimage.extend_from_slice(&application_domain(&payload.application_domain)?);
    preimage.push(MessageFormat::detect(body) as u8);
    preimage.push(1);
    preimage.extend_from_slice(&signer_key(&payload.signer)?);
    preimage.extend_from_slice(&len.to_le_bytes());
    preimage.extend_from_slice(body);

    Ok(SigningPayload::single(
        ChainFamily::Sol,
        preimage,
        DigestAlgorithm::None,
        SignatureScheme::Ed25519,
    )
    .with_preview(message.to_string()))
}
