//! Signature hash preimages
//!
//! Each function returns the exact bytes that get hashed: legacy and BIP-143
//! preimages are hashed with double SHA-256, BIP-341 messages with the
//! "TapSighash" tagged hash. Hashing is left to the signer.

use crate::bitcoin::sighash::{EcdsaSighashType, Prevouts, SighashCache, TapSighashType};
use crate::bitcoin::{Amount, Script, Transaction, TxOut};
use crate::error::{Result, WasmWalletError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SighashKind {
    /// Taproot only: commits like ALL, signature carries no sighash byte
    Default,
    All,
    None,
    Single,
    AllAnyoneCanPay,
    NoneAnyoneCanPay,
    SingleAnyoneCanPay,
}

impl SighashKind {
    pub fn to_u32(self) -> u32 {
        self.taproot() as u32
    }

    fn taproot(self) -> TapSighashType {
        match self {
            SighashKind::Default => TapSighashType::Default,
            SighashKind::All => TapSighashType::All,
            SighashKind::None => TapSighashType::None,
            SighashKind::Single => TapSighashType::Single,
            SighashKind::AllAnyoneCanPay => TapSighashType::AllPlusAnyoneCanPay,
            SighashKind::NoneAnyoneCanPay => TapSighashType::NonePlusAnyoneCanPay,
            SighashKind::SingleAnyoneCanPay => TapSighashType::SinglePlusAnyoneCanPay,
        }
    }

    fn ecdsa(self) -> Result<EcdsaSighashType> {
        Ok(match self {
            SighashKind::Default => {
                return Err(WasmWalletError::InvalidFieldCombination(
                    "SIGHASH_DEFAULT is only valid for taproot inputs".to_string(),
                ))
            }
            SighashKind::All => EcdsaSighashType::All,
            SighashKind::None => EcdsaSighashType::None,
            SighashKind::Single => EcdsaSighashType::Single,
            SighashKind::AllAnyoneCanPay => EcdsaSighashType::AllPlusAnyoneCanPay,
            SighashKind::NoneAnyoneCanPay => EcdsaSighashType::NonePlusAnyoneCanPay,
            SighashKind::SingleAnyoneCanPay => EcdsaSighashType::SinglePlusAnyoneCanPay,
        })
    }

    fn is_single(self) -> bool {
        matches!(self, SighashKind::Single | SighashKind::SingleAnyoneCanPay)
    }
}

fn require_input(tx: &Transaction, index: usize) -> Result<()> {
    if index >= tx.input.len() {
        return Err(WasmWalletError::Validation(format!(
            "input index {} out of range ({} inputs)",
            index,
            tx.input.len()
        )));
    }
    Ok(())
}

fn single_without_output(index: usize) -> WasmWalletError {
    WasmWalletError::unsupported(format!(
        "SIGHASH_SINGLE for input {} without a matching output",
        index
    ))
}

fn encode_error(err: impl std::fmt::Display) -> WasmWalletError {
    WasmWalletError::Validation(format!("Sighash encoding failed: {}", err))
}

/// Pre-segwit preimage: modified transaction copy followed by the sighash type
pub fn legacy_preimage(
    tx: &Transaction,
    index: usize,
    script_code: &Script,
    sighash: SighashKind,
) -> Result<Vec<u8>> {
    require_input(tx, index)?;
    let sighash = sighash.ecdsa()?;
    let mut preimage = Vec::new();
    let single_bug = SighashCache::new(tx)
        .legacy_encode_signing_data_to(&mut preimage, index, script_code, sighash.to_u32())
        .is_sighash_single_bug()
        .map_err(encode_error)?;
    if single_bug {
        return Err(single_without_output(index));
    }
    Ok(preimage)
}

/// BIP-143 preimage for segwit v0 inputs
pub fn segwit_v0_preimage(
    tx: &Transaction,
    index: usize,
    script_code: &Script,
    value: u64,
    sighash: SighashKind,
) -> Result<Vec<u8>> {
    require_input(tx, index)?;
    let sighash = sighash.ecdsa()?;
    let mut preimage = Vec::with_capacity(160 + script_code.len());
    SighashCache::new(tx)
        .segwit_v0_encode_signing_data_to(
            &mut preimage,
            index,
            script_code,
            Amount::from_sat(value),
            sighash,
        )
        .map_err(encode_error)?;
    Ok(preimage)
}

/// BIP-341 key-path signature message, epoch byte included
pub fn taproot_key_spend_preimage(
    tx: &Transaction,
    index: usize,
    prevouts: &[TxOut],
    sighash: SighashKind,
) -> Result<Vec<u8>> {
    require_input(tx, index)?;
    if prevouts.len() != tx.input.len() {
        return Err(WasmWalletError::Validation(format!(
            "taproot signing needs all {} prevouts, got {}",
            tx.input.len(),
            prevouts.len()
        )));
    }
    if sighash.is_single() && index >= tx.output.len() {
        return Err(single_without_output(index));
    }
    let mut msg = Vec::with_capacity(206);
    SighashCache::new(tx)
        .taproot_encode_signing_data_to(
            &mut msg,
            index,
            &Prevouts::All(prevouts),
            None,
            None,
            sighash.taproot(),
        )
        .map_err(encode_error)?;
    Ok(msg)
}
