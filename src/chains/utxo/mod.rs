//! UTXO (bitcoin-like) transaction encoder

pub mod address;
pub mod sighash;

pub use address::{to_output_script, UtxoNetwork};
pub use sighash::SighashKind;

use crate::bitcoin::consensus::encode::serialize;
use crate::bitcoin::key::{CompressedPublicKey, TweakedPublicKey};
use crate::bitcoin::script::{Builder, PushBytesBuf};
use crate::bitcoin::secp256k1::{ecdsa, schnorr, XOnlyPublicKey};
use crate::bitcoin::{
    absolute, transaction, Amount, EcdsaSighashType, OutPoint, ScriptBuf, Sequence, Transaction,
    TxIn, TxOut, Txid, Witness,
};
use crate::chain::ChainFamily;
use crate::error::{Result, WasmWalletError};
use crate::model::signing::{
    expect_signature_len, expect_signatures, DigestAlgorithm, Encoder, PayloadEntry,
    SignatureScheme, SignedPayload, SigningPayload,
};
use crate::primitives::amount::u64_str;
use crate::primitives::bytes::{decode_hex, hex_bytes};
use crate::selection::{FeeRate, SelectionResult, TargetOutput};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Largest OP_RETURN payload relayed by default policy
pub const MAX_OP_RETURN_DATA: usize = 80;

const DEFAULT_SEQUENCE: u32 = 0xffff_fffd;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptType {
    P2pkh,
    P2shP2wpkh,
    P2wpkh,
    P2wsh,
    P2tr,
}

impl ScriptType {
    pub fn is_segwit(&self) -> bool {
        !matches!(self, ScriptType::P2pkh)
    }
}

fn default_sequence() -> u32 {
    DEFAULT_SEQUENCE
}

fn default_version() -> i32 {
    2
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoInput {
    /// Previous transaction id in display (reversed) hex
    pub txid: String,
    pub vout: u32,
    #[serde(with = "u64_str")]
    pub value: u64,
    pub script_type: ScriptType,
    /// Compressed key for ECDSA inputs; x-only output key for P2TR
    pub public_key: String,
    #[serde(default = "default_sequence")]
    pub sequence: u32,
    /// Defaults to DEFAULT for P2TR and ALL otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sighash: Option<SighashKind>,
}

impl UtxoInput {
    fn sighash_kind(&self) -> SighashKind {
        self.sighash.unwrap_or(match self.script_type {
            ScriptType::P2tr => SighashKind::Default,
            _ => SighashKind::All,
        })
    }

    fn compressed_key(&self) -> Result<CompressedPublicKey> {
        CompressedPublicKey::from_slice(&decode_hex(&self.public_key)?)
            .map_err(|e| WasmWalletError::Validation(format!("Invalid public key: {}", e)))
    }

    fn x_only_key(&self) -> Result<XOnlyPublicKey> {
        XOnlyPublicKey::from_slice(&decode_hex(&self.public_key)?)
            .map_err(|e| WasmWalletError::Validation(format!("Invalid x-only key: {}", e)))
    }

    /// scriptPubKey of the output being spent
    fn prevout_script(&self) -> Result<ScriptBuf> {
        Ok(match self.script_type {
            ScriptType::P2pkh => ScriptBuf::new_p2pkh(&self.compressed_key()?.pubkey_hash()),
            ScriptType::P2wpkh => ScriptBuf::new_p2wpkh(&self.compressed_key()?.wpubkey_hash()),
            ScriptType::P2shP2wpkh => ScriptBuf::new_p2sh(&self.redeem_script()?.script_hash()),
            ScriptType::P2tr => ScriptBuf::new_p2tr_tweaked(
                TweakedPublicKey::dangerous_assume_tweaked(self.x_only_key()?),
            ),
            ScriptType::P2wsh => {
                return Err(WasmWalletError::unsupported(
                    "spending P2WSH inputs requires a witness script",
                ))
            }
        })
    }

    fn redeem_script(&self) -> Result<ScriptBuf> {
        Ok(ScriptBuf::new_p2wpkh(&self.compressed_key()?.wpubkey_hash()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UtxoOutput {
    #[serde(rename_all = "camelCase")]
    Address {
        address: String,
        #[serde(with = "u64_str")]
        value: u64,
    },
    #[serde(rename_all = "camelCase")]
    Script {
        #[serde(with = "hex_bytes")]
        script_pubkey: Vec<u8>,
        #[serde(with = "u64_str")]
        value: u64,
    },
    OpReturn {
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
    },
}

impl UtxoOutput {
    pub fn value(&self) -> u64 {
        match self {
            UtxoOutput::Address { value, .. } | UtxoOutput::Script { value, .. } => *value,
            UtxoOutput::OpReturn { .. } => 0,
        }
    }

    fn to_tx_out(&self, network: UtxoNetwork) -> Result<TxOut> {
        let script_pubkey = match self {
            UtxoOutput::Address { address, .. } => to_output_script(address, network)?,
            UtxoOutput::Script { script_pubkey, .. } => ScriptBuf::from_bytes(script_pubkey.clone()),
            UtxoOutput::OpReturn { data } => {
                if data.len() > MAX_OP_RETURN_DATA {
                    return Err(format!(
                        "OP_RETURN data is {} bytes, at most {} allowed",
                        data.len(),
                        MAX_OP_RETURN_DATA
                    )
                    .into());
                }
                ScriptBuf::new_op_return(push_bytes(data.clone())?)
            }
        };
        Ok(TxOut {
            value: Amount::from_sat(self.value()),
            script_pubkey,
        })
    }
}

fn push_bytes(bytes: Vec<u8>) -> Result<PushBytesBuf> {
    PushBytesBuf::try_from(bytes).map_err(|e| WasmWalletError::overflow(e.to_string()))
}

/// An unsigned bitcoin-like transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoTransaction {
    #[serde(default)]
    pub network: UtxoNetwork,
    #[serde(default = "default_version")]
    pub version: i32,
    #[serde(default)]
    pub lock_time: u32,
    pub inputs: Vec<UtxoInput>,
    pub outputs: Vec<UtxoOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_rate: Option<FeeRate>,
}

impl UtxoTransaction {
    /// Build the transaction a selection run describes. Change goes to `change_address`.
    pub fn from_selection(
        selection: &SelectionResult,
        network: UtxoNetwork,
        fee_rate: FeeRate,
        change_address: Option<&str>,
    ) -> Result<Self> {
        let inputs = selection
            .inputs
            .iter()
            .map(|unit| {
                let (txid, vout) = unit.outpoint()?;
                let public_key = unit.public_key.clone().ok_or_else(|| {
                    WasmWalletError::Validation(format!("unit {} has no public key", unit.id))
                })?;
                Ok(UtxoInput {
                    txid,
                    vout,
                    value: unit.value,
                    script_type: unit.script_type,
                    public_key,
                    sequence: DEFAULT_SEQUENCE,
                    sighash: None,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut outputs: Vec<UtxoOutput> = selection
            .outputs
            .iter()
            .map(|output| match &output.target {
                TargetOutput::Payment { address, .. } | TargetOutput::SendMax { address, .. } => {
                    UtxoOutput::Address {
                        address: address.clone(),
                        value: output.value,
                    }
                }
                TargetOutput::OpReturn { data } => UtxoOutput::OpReturn { data: data.clone() },
            })
            .collect();

        if let Some(change) = &selection.change_output {
            let address = change_address
                .ok_or("selection produced change but no change address was given")?;
            outputs.push(UtxoOutput::Address {
                address: address.to_string(),
                value: change.value,
            });
        }

        let tx = UtxoTransaction {
            network,
            version: default_version(),
            lock_time: 0,
            inputs,
            outputs,
            fee_rate: Some(fee_rate),
        };
        tx.validate()?;
        Ok(tx)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err("transaction has no inputs".into());
        }
        if self.outputs.is_empty() {
            return Err("transaction has no outputs".into());
        }
        let total_in = self
            .inputs
            .iter()
            .try_fold(0u64, |acc, i| acc.checked_add(i.value))
            .ok_or_else(|| WasmWalletError::overflow("input total exceeds u64"))?;
        let total_out = self
            .outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.value()))
            .ok_or_else(|| WasmWalletError::overflow("output total exceeds u64"))?;
        if total_out > total_in {
            return Err(format!("outputs ({}) exceed inputs ({})", total_out, total_in).into());
        }
        if !self.network.supports_segwit()
            && self.inputs.iter().any(|i| i.script_type.is_segwit())
        {
            return Err(WasmWalletError::unsupported(format!(
                "{:?} has no segwit inputs",
                self.network
            )));
        }
        Ok(())
    }

    pub fn fee(&self) -> u64 {
        let total_in: u64 = self.inputs.iter().map(|i| i.value).sum();
        let total_out: u64 = self.outputs.iter().map(|o| o.value()).sum();
        total_in.saturating_sub(total_out)
    }

    fn unsigned_tx(&self) -> Result<Transaction> {
        let input = self
            .inputs
            .iter()
            .map(|i| {
                let txid = Txid::from_str(&i.txid)
                    .map_err(|e| WasmWalletError::Validation(format!("Invalid txid: {}", e)))?;
                Ok(TxIn {
                    previous_output: OutPoint { txid, vout: i.vout },
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence(i.sequence),
                    witness: Witness::new(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let output = self
            .outputs
            .iter()
            .map(|o| o.to_tx_out(self.network))
            .collect::<Result<Vec<_>>>()?;
        Ok(Transaction {
            version: transaction::Version(self.version),
            lock_time: absolute::LockTime::from_consensus(self.lock_time),
            input,
            output,
        })
    }

    fn prevouts(&self) -> Result<Vec<TxOut>> {
        self.inputs
            .iter()
            .map(|i| {
                Ok(TxOut {
                    value: Amount::from_sat(i.value),
                    script_pubkey: i.prevout_script()?,
                })
            })
            .collect()
    }

    fn input_entry(
        &self,
        tx: &Transaction,
        prevouts: &[TxOut],
        index: usize,
    ) -> Result<PayloadEntry> {
        let input = &self.inputs[index];
        let kind = input.sighash_kind();
        Ok(match input.script_type {
            ScriptType::P2pkh => PayloadEntry::new(
                sighash::legacy_preimage(tx, index, &prevouts[index].script_pubkey, kind)?,
                DigestAlgorithm::DoubleSha256,
                SignatureScheme::Secp256k1Ecdsa,
            ),
            ScriptType::P2wpkh | ScriptType::P2shP2wpkh => {
                let script_code = ScriptBuf::new_p2pkh(&input.compressed_key()?.pubkey_hash());
                PayloadEntry::new(
                    sighash::segwit_v0_preimage(tx, index, &script_code, input.value, kind)?,
                    DigestAlgorithm::DoubleSha256,
                    SignatureScheme::Secp256k1Ecdsa,
                )
            }
            ScriptType::P2tr => PayloadEntry::new(
                sighash::taproot_key_spend_preimage(tx, index, prevouts, kind)?,
                DigestAlgorithm::TapSighash,
                SignatureScheme::Secp256k1Schnorr,
            ),
            ScriptType::P2wsh => {
                return Err(WasmWalletError::unsupported(
                    "spending P2WSH inputs requires a witness script",
                ))
            }
        })
    }

    fn preview(&self) -> String {
        let sent: Vec<String> = self
            .outputs
            .iter()
            .map(|o| match o {
                UtxoOutput::Address { address, value } => format!("{} sat to {}", value, address),
                UtxoOutput::Script { value, .. } => format!("{} sat to script", value),
                UtxoOutput::OpReturn { data } => format!("OP_RETURN {} bytes", data.len()),
            })
            .collect();
        format!("Send {}; fee {} sat", sent.join(", "), self.fee())
    }
}

/// DER signature with the sighash byte appended, from a 64/65-byte compact signature
fn ecdsa_signature_bytes(signature: &[u8], kind: SighashKind) -> Result<Vec<u8>> {
    expect_signature_len(signature, &[64, 65])?;
    let mut sig = ecdsa::Signature::from_compact(&signature[..64])
        .map_err(|e| WasmWalletError::Validation(format!("Invalid ECDSA signature: {}", e)))?;
    sig.normalize_s();
    let sighash_type = EcdsaSighashType::from_consensus(kind.to_u32());
    Ok(crate::bitcoin::ecdsa::Signature {
        signature: sig,
        sighash_type,
    }
    .to_vec())
}

fn schnorr_signature_bytes(signature: &[u8], kind: SighashKind) -> Result<Vec<u8>> {
    expect_signature_len(signature, &[64])?;
    schnorr::Signature::from_slice(signature)
        .map_err(|e| WasmWalletError::Validation(format!("Invalid Schnorr signature: {}", e)))?;
    let mut bytes = signature.to_vec();
    if kind != SighashKind::Default {
        bytes.push(kind.to_u32() as u8);
    }
    Ok(bytes)
}

impl Encoder for UtxoTransaction {
    fn chain(&self) -> ChainFamily {
        ChainFamily::Btc
    }

    fn build_signing_payload(&self) -> Result<SigningPayload> {
        self.validate()?;
        let tx = self.unsigned_tx()?;
        let prevouts = self.prevouts()?;
        let entries = (0..self.inputs.len())
            .map(|index| self.input_entry(&tx, &prevouts, index))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(inputs = entries.len(), "built utxo signing payload");
        Ok(SigningPayload::new(ChainFamily::Btc, entries).with_preview(self.preview()))
    }

    fn assemble_signed_payload(&self, signatures: &[Vec<u8>]) -> Result<SignedPayload> {
        self.validate()?;
        expect_signatures(signatures, self.inputs.len())?;
        let mut tx = self.unsigned_tx()?;

        for (index, (input, signature)) in self.inputs.iter().zip(signatures).enumerate() {
            let kind = input.sighash_kind();
            let txin = &mut tx.input[index];
            match input.script_type {
                ScriptType::P2pkh => {
                    let key = input.compressed_key()?;
                    txin.script_sig = Builder::new()
                        .push_slice(push_bytes(ecdsa_signature_bytes(signature, kind)?)?)
                        .push_slice(push_bytes(key.to_bytes().to_vec())?)
                        .into_script();
                }
                ScriptType::P2wpkh | ScriptType::P2shP2wpkh => {
                    let key = input.compressed_key()?;
                    txin.witness = Witness::from_slice(&[
                        ecdsa_signature_bytes(signature, kind)?,
                        key.to_bytes().to_vec(),
                    ]);
                    if input.script_type == ScriptType::P2shP2wpkh {
                        txin.script_sig = Builder::new()
                            .push_slice(push_bytes(input.redeem_script()?.into_bytes())?)
                            .into_script();
                    }
                }
                ScriptType::P2tr => {
                    txin.witness = Witness::from_slice(&[schnorr_signature_bytes(signature, kind)?]);
                }
                ScriptType::P2wsh => {
                    return Err(WasmWalletError::unsupported(
                        "spending P2WSH inputs requires a witness script",
                    ))
                }
            }
        }

        Ok(SignedPayload {
            chain: ChainFamily::Btc,
            raw: serialize(&tx),
            txid: tx.compute_txid().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitcoin::consensus::encode::deserialize;
    use crate::bitcoin::secp256k1::{Message, Secp256k1, SecretKey};

    const TXID: &str = "fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f";

    fn secret_key() -> SecretKey {
        SecretKey::from_slice(&[0x11; 32]).unwrap()
    }

    fn public_key_hex() -> String {
        let secp = Secp256k1::new();
        hex::encode(secret_key().public_key(&secp).serialize())
    }

    fn tx_with(script_type: ScriptType) -> UtxoTransaction {
        UtxoTransaction {
            network: UtxoNetwork::Bitcoin,
            version: 2,
            lock_time: 0,
            inputs: vec![UtxoInput {
                txid: TXID.to_string(),
                vout: 1,
                value: 100_000,
                script_type,
                public_key: public_key_hex(),
                sequence: DEFAULT_SEQUENCE,
                sighash: None,
            }],
            outputs: vec![
                UtxoOutput::Address {
                    address: "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4".to_string(),
                    value: 60_000,
                },
                UtxoOutput::OpReturn {
                    data: b"memo".to_vec(),
                },
            ],
            fee_rate: None,
        }
    }

    fn sign_all(payload: &SigningPayload) -> Vec<Vec<u8>> {
        let secp = Secp256k1::new();
        payload
            .entries
            .iter()
            .map(|entry| {
                let digest: [u8; 32] = entry.message_digest().try_into().unwrap();
                let msg = Message::from_digest(digest);
                secp.sign_ecdsa(&msg, &secret_key()).serialize_compact().to_vec()
            })
            .collect()
    }

    #[test]
    fn test_signing_payload_is_deterministic() {
        let tx = tx_with(ScriptType::P2wpkh);
        let a = tx.build_signing_payload().unwrap();
        let b = tx.build_signing_payload().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.entries.len(), 1);
        assert_eq!(a.entries[0].digest, DigestAlgorithm::DoubleSha256);
        assert_eq!(a.preview.as_deref(), Some("Send 60000 sat to bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4, OP_RETURN 4 bytes; fee 40000 sat"));
    }

    #[test]
    fn test_p2wpkh_assembly_roundtrip() {
        let tx = tx_with(ScriptType::P2wpkh);
        let payload = tx.build_signing_payload().unwrap();
        let signed = tx.assemble_signed_payload(&sign_all(&payload)).unwrap();

        let parsed: Transaction = deserialize(&signed.raw).unwrap();
        assert_eq!(parsed.compute_txid().to_string(), signed.txid);
        assert_eq!(parsed.input.len(), 1);
        assert_eq!(parsed.input[0].previous_output.vout, 1);
        assert_eq!(parsed.input[0].witness.len(), 2);
        assert!(parsed.input[0].script_sig.is_empty());
        assert_eq!(parsed.output[0].value, Amount::from_sat(60_000));
        assert!(parsed.output[1].script_pubkey.is_op_return());
    }

    #[test]
    fn test_p2pkh_and_nested_segwit_script_sig() {
        for script_type in [ScriptType::P2pkh, ScriptType::P2shP2wpkh] {
            let tx = tx_with(script_type);
            let payload = tx.build_signing_payload().unwrap();
            let signed = tx.assemble_signed_payload(&sign_all(&payload)).unwrap();
            let parsed: Transaction = deserialize(&signed.raw).unwrap();
            assert!(!parsed.input[0].script_sig.is_empty());
            assert_eq!(
                parsed.input[0].witness.is_empty(),
                script_type == ScriptType::P2pkh
            );
        }
    }

    #[test]
    fn test_signature_count_mismatch() {
        let tx = tx_with(ScriptType::P2wpkh);
        assert!(tx.assemble_signed_payload(&[]).is_err());
    }

    #[test]
    fn test_outputs_exceeding_inputs_rejected() {
        let mut tx = tx_with(ScriptType::P2wpkh);
        tx.outputs.push(UtxoOutput::Script {
            script_pubkey: vec![0x51],
            value: 50_000,
        });
        assert!(tx.build_signing_payload().is_err());
    }

    #[test]
    fn test_dogecoin_rejects_segwit_inputs() {
        let mut tx = tx_with(ScriptType::P2wpkh);
        tx.network = UtxoNetwork::Dogecoin;
        let err = tx.build_signing_payload().unwrap_err();
        assert!(matches!(err, WasmWalletError::UnsupportedChainVariant(_)));
    }

    #[test]
    fn test_taproot_payload_digest() {
        let mut tx = tx_with(ScriptType::P2tr);
        tx.inputs[0].public_key =
            "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798".to_string();
        let payload = tx.build_signing_payload().unwrap();
        assert_eq!(payload.entries[0].digest, DigestAlgorithm::TapSighash);
        assert_eq!(payload.entries[0].preimage[0], 0x00);

        let signed = tx.assemble_signed_payload(&[vec![0x01; 64]]);
        // all-0x01 is a structurally valid schnorr signature
        let parsed: Transaction = deserialize(&signed.unwrap().raw).unwrap();
        assert_eq!(parsed.input[0].witness.len(), 1);
        assert_eq!(parsed.input[0].witness.nth(0).unwrap().len(), 64);
    }
}
