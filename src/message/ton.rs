//! TON Connect `signProof` and `signData`

use crate::chain::ChainFamily;
use crate::chains::ton::boc::parse_boc_base64;
use crate::chains::ton::cell::snake_cell;
use crate::chains::ton::{Cell, CellBuilder, TonAddress};
use crate::error::{Result, WasmWalletError};
use crate::model::message::{TonMessagePayload, TonSignDataPayload};
use crate::model::signing::{DigestAlgorithm, SignatureScheme, SigningPayload};
use crate::primitives::bytes::decode_base64;
use crate::primitives::checksum::crc32;
use sha2::{Digest, Sha256};

const PROOF_ITEM_PREFIX: &[u8] = b"ton-proof-item-v2/";
const PROOF_PREFIX: &[u8] = b"ton-connect";
const SIGN_DATA_PREFIX: &[u8] = b"ton-connect/sign-data/";
const SIGN_DATA_CELL_TAG: u32 = 0x7556_9022;

fn parts(payload: &TonMessagePayload) -> Result<(TonAddress, u64)> {
    let (address, _) = TonAddress::parse(&payload.address)?;
    let timestamp = payload
        .timestamp
        .ok_or_else(|| WasmWalletError::Validation("missing timestamp".to_string()))?;
    Ok((address, timestamp))
}

fn ed25519(preimage: Vec<u8>, digest: DigestAlgorithm) -> SigningPayload {
    SigningPayload::single(ChainFamily::Ton, preimage, digest, SignatureScheme::Ed25519)
}

/// `0xffff || "ton-connect" || sha256(proof item)`; the item mixes byte orders
pub fn sign_proof(message: &str, payload: &TonMessagePayload) -> Result<SigningPayload> {
    let (address, timestamp) = parts(payload)?;
    let domain = payload.app_domain.as_bytes();
    let domain_len = u32::try_from(domain.len())
        .map_err(|_| WasmWalletError::Validation("app domain too long".to_string()))?;

    let mut item = Vec::with_capacity(PROOF_ITEM_PREFIX.len() + 48 + domain.len() + message.len());
    item.extend_from_slice(PROOF_ITEM_PREFIX);
    item.extend_from_slice(&address.workchain.to_be_bytes());
    item.extend_from_slice(&address.hash);
    item.extend_from_slice(&domain_len.to_le_bytes());
    item.extend_from_slice(domain);
    item.extend_from_slice(&timestamp.to_le_bytes());
    item.extend_from_slice(message.as_bytes());

    let mut preimage = vec![0xff, 0xff];
    preimage.extend_from_slice(PROOF_PREFIX);
    preimage.extend_from_slice(&Sha256::digest(&item));
    Ok(ed25519(preimage, DigestAlgorithm::Sha256)
        .with_preview(format!("Prove ownership of {} to {}", payload.address, payload.app_domain)))
}

/// `signData` as defined by TON Connect 2.x
pub fn sign_data_v1(payload: &TonMessagePayload) -> Result<SigningPayload> {
    let (address, timestamp) = parts(payload)?;
    let data = payload
        .payload
        .as_ref()
        .ok_or_else(|| WasmWalletError::Validation("signData requires a payload".to_string()))?;

    let (tag, bytes): (&[u8], Vec<u8>) = match data {
        TonSignDataPayload::Text { text } => (b"txt", text.as_bytes().to_vec()),
        TonSignDataPayload::Binary { bytes } => (b"bin", decode_base64(bytes)?),
        TonSignDataPayload::Cell { schema, cell } => {
            return sign_data_cell(&address, timestamp, &payload.app_domain, schema, cell);
        }
    };
    let domain = payload.app_domain.as_bytes();
    let too_long = |what: &str| WasmWalletError::Validation(format!("{} too long", what));
    let domain_len = u32::try_from(domain.len()).map_err(|_| too_long("app domain"))?;
    let data_len = u32::try_from(bytes.len()).map_err(|_| too_long("signData payload"))?;

    let mut preimage = Vec::with_capacity(SIGN_DATA_PREFIX.len() + 60 + domain.len() + bytes.len());
    preimage.extend_from_slice(&[0xff, 0xff]);
    preimage.extend_from_slice(SIGN_DATA_PREFIX);
    preimage.extend_from_slice(&address.workchain.to_be_bytes());
    preimage.extend_from_slice(&address.hash);
    preimage.extend_from_slice(&domain_len.to_be_bytes());
    preimage.extend_from_slice(domain);
    preimage.extend_from_slice(&timestamp.to_be_bytes());
    preimage.extend_from_slice(tag);
    preimage.extend_from_slice(&data_len.to_be_bytes());
    preimage.extend_from_slice(&bytes);

    let preview = match data {
        TonSignDataPayload::Text { text } => text.clone(),
        _ => format!("{} bytes of binary data", bytes.len()),
    };
    Ok(ed25519(preimage, DigestAlgorithm::Sha256).with_preview(preview))
}

fn sign_data_cell(
    address: &TonAddress,
    timestamp: u64,
    app_domain: &str,
    schema: &str,
    cell: &str,
) -> Result<SigningPayload> {
    let payload_cell = parse_boc_base64(cell)?;
    let domain = snake_cell(&CellBuilder::new(), app_domain.as_bytes())?;

    let mut b = CellBuilder::new();
    b.store_uint(SIGN_DATA_CELL_TAG as u128, 32)?
        .store_uint(crc32(schema.as_bytes()) as u128, 32)?
        .store_uint(timestamp as u128, 64)?
        .store_address(Some(address))?
        .store_ref(domain)?
        .store_ref(payload_cell)?;
    let root = b.build()?;
    Ok(ed25519(root.hash().to_vec(), DigestAlgorithm::None).with_preview(schema.to_string()))
}

/// Pre-2.x `signData`: `schema_crc:uint32 timestamp:uint64 ^cell`, signed over its hash
pub fn sign_data_legacy(payload: &TonMessagePayload) -> Result<SigningPayload> {
    let (_, timestamp) = parts(payload)?;
    let (schema_crc, cell) = match (&payload.schema_crc, &payload.payload) {
        (Some(crc), Some(TonSignDataPayload::Cell { cell, .. })) => (*crc, cell),
        _ => {
            return Err(WasmWalletError::InvalidFieldCombination(
                "legacy signData requires schemaCrc and a cell payload".to_string(),
            ))
        }
    };
    let data: Cell = parse_boc_base64(cell)?;

    let mut b = CellBuilder::new();
    b.store_uint(schema_crc as u128, 32)?
        .store_uint(timestamp as u128, 64)?
        .store_ref(data)?;
    let root = b.build()?;
    Ok(ed25519(root.hash().to_vec(), DigestAlgorithm::None))
}
