//! Bitcoin message signing: BIP-137 and BIP-322 "simple"
//!
//! BIP-322 signs the input of a virtual `to_sign` transaction spending a
//! virtual `to_spend` output locked to the signer's address.

use crate::bitcoin::absolute::LockTime;
use crate::bitcoin::hashes::{sha256, Hash, HashEngine};
use crate::bitcoin::script::Builder;
use crate::bitcoin::{
    opcodes, transaction, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
    Witness,
};
use crate::chain::ChainFamily;
use crate::chains::utxo::sighash::{segwit_v0_preimage, taproot_key_spend_preimage};
use crate::chains::utxo::{to_output_script, SighashKind, UtxoNetwork};
use crate::error::{Result, WasmWalletError};
use crate::model::message::BtcSigOptions;
use crate::model::signing::{DigestAlgorithm, SignatureScheme, SigningPayload};
use crate::primitives::bytes::encode_base64;
use crate::primitives::varint::compact_size;

pub const BITCOIN_SIGNED_MESSAGE_PREFIX: &[u8] = b"\x18Bitcoin Signed Message:\n";
const BIP322_TAG: &str = "BIP0322-signed-message";

/// `prefix || CompactSize(len) || message`, signed over its double SHA-256
pub fn bip137(message: &str) -> Result<SigningPayload> {
    let bytes = message.as_bytes();
    let mut preimage = Vec::with_capacity(BITCOIN_SIGNED_MESSAGE_PREFIX.len() + 9 + bytes.len());
    preimage.extend_from_slice(BITCOIN_SIGNED_MESSAGE_PREFIX);
    preimage.extend_from_slice(&compact_size(bytes.len()));
    preimage.extend_from_slice(bytes);
    Ok(SigningPayload::single(
        ChainFamily::Btc,
        preimage,
        DigestAlgorithm::DoubleSha256,
        SignatureScheme::Secp256k1Ecdsa,
    )
    .with_preview(message.to_string()))
}

/// Base64 BIP-137 signature from `r || s || recovery id`.
///
/// The header encodes the recovery id and, unless `noScriptType` is set, the
/// address type: 31 for P2PKH, 35 for P2SH-P2WPKH, 39 for P2WPKH.
pub fn bip137_signature(
    signature: &[u8],
    address: Option<&str>,
    options: &BtcSigOptions,
) -> Result<String> {
    if signature.len() != 65 || signature[64] > 3 {
        return Err("BIP-137 needs a 64-byte signature and a recovery id 0..=3".into());
    }
    let offset = match address {
        Some(address) if !options.no_script_type => {
            let script = script_for_address(address)?;
            if script.is_p2pkh() {
                31
            } else if script.is_p2sh() {
                35
            } else if script.is_p2wpkh() {
                39
            } else {
                return Err(WasmWalletError::unsupported(format!(
                    "BIP-137 has no header for {}",
                    address
                )));
            }
        }
        _ => 31,
    };
    let mut out = Vec::with_capacity(65);
    out.push(offset + signature[64]);
    out.extend_from_slice(&signature[..64]);
    Ok(encode_base64(&out))
}

fn script_for_address(address: &str) -> Result<ScriptBuf> {
    [UtxoNetwork::Bitcoin, UtxoNetwork::Testnet, UtxoNetwork::Regtest]
        .iter()
        .find_map(|network| to_output_script(address, *network).ok())
        .ok_or_else(|| WasmWalletError::Validation(format!("Invalid bitcoin address '{}'", address)))
}

/// `SHA256(SHA256(tag) || SHA256(tag) || message)`
pub(crate) fn message_hash(message: &[u8]) -> [u8; 32] {
    let tag = sha256::Hash::hash(BIP322_TAG.as_bytes());
    let mut engine = sha256::Hash::engine();
    engine.input(tag.as_ref());
    engine.input(tag.as_ref());
    engine.input(message);
    sha256::Hash::from_engine(engine).to_byte_array()
}

pub(crate) fn to_spend_tx(message: &[u8], script_pubkey: ScriptBuf) -> Transaction {
    let script_sig = Builder::new()
        .push_opcode(opcodes::OP_0)
        .push_slice(message_hash(message))
        .into_script();
    Transaction {
        version: transaction::Version(0),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: Txid::all_zeros(),
                vout: 0xffff_ffff,
            },
            script_sig,
            sequence: Sequence::ZERO,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::ZERO,
            script_pubkey,
        }],
    }
}

pub(crate) fn to_sign_tx(to_spend: &Transaction) -> Transaction {
    Transaction {
        version: transaction::Version(0),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: to_spend.compute_txid(),
                vout: 0,
            },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ZERO,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::ZERO,
            script_pubkey: Builder::new()
                .push_opcode(opcodes::all::OP_RETURN)
                .into_script(),
        }],
    }
}

/// BIP-322 simple signature for a P2WPKH or P2TR (key path) address
pub fn bip322_simple(message: &str, address: &str) -> Result<SigningPayload> {
    let script_pubkey = script_for_address(address)?;
    let to_spend = to_spend_tx(message.as_bytes(), script_pubkey.clone());
    let to_sign = to_sign_tx(&to_spend);

    let payload = if script_pubkey.is_p2wpkh() {
        // scriptCode is the P2PKH script of the witness program
        let program = &script_pubkey.as_bytes()[2..22];
        let mut script_code = vec![0x76, 0xa9, 0x14];
        script_code.extend_from_slice(program);
        script_code.extend_from_slice(&[0x88, 0xac]);
        let preimage = segwit_v0_preimage(
            &to_sign,
            0,
            &ScriptBuf::from_bytes(script_code),
            0,
            SighashKind::All,
        )?;
        SigningPayload::single(
            ChainFamily::Btc,
            preimage,
            DigestAlgorithm::DoubleSha256,
            SignatureScheme::Secp256k1Ecdsa,
        )
    } else if script_pubkey.is_p2tr() {
        let preimage =
            taproot_key_spend_preimage(&to_sign, 0, &to_spend.output, SighashKind::Default)?;
        SigningPayload::single(
            ChainFamily::Btc,
            preimage,
            DigestAlgorithm::TapSighash,
            SignatureScheme::Secp256k1Schnorr,
        )
    } else {
        return Err(WasmWalletError::unsupported(format!(
            "BIP-322 simple signing supports P2WPKH and P2TR, not {}",
            address
        )));
    };
    Ok(payload.with_preview(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitcoin::sighash::{EcdsaSighashType, Prevouts, SighashCache, TapSighashType};
    use rstest::rstest;

    const P2WPKH: &str = "bc1q9vza2e8x573nczrlzms0wvx3gsqjx7vavgkx0l";

    #[test]
    fn test_bip137_prefix() {
        let payload = bip137("Hello World").unwrap();
        assert_eq!(
            payload.preimage().unwrap(),
            b"\x18Bitcoin Signed Message:\n\x0bHello World"
        );
        assert_eq!(payload.entries[0].digest, DigestAlgorithm::DoubleSha256);
    }

    #[rstest]
    #[case(b"", "c90c269c4f8fcbe6880f72a721ddfbf1914268a794cbb21cfafee13770ae19f1")]
    #[case(b"Hello World", "f0eb03b1a75ac6d9847f55c624a99169b5dccba2a31f5b23bea77ba270de0a7a")]
    fn test_bip322_message_hash(#[case] message: &[u8], #[case] expected: &str) {
        assert_eq!(hex::encode(message_hash(message)), expected);
    }

    #[rstest]
    #[case(
        "",
        "c5680aa69bb8d860bf82d4e9cd3504b55dde018de765a91bb566283c545a99a7",
        "1e9654e951a5ba44c8604c4de6c67fd78a27e81dcadcfe1edf638ba3aaebaed6"
    )]
    #[case(
        "Hello World",
        "b79d196740ad5217771c1098fc4a4b51e0535c32236c71f1ea4d61a2d603352b",
        "88737ae86f2077145f93cc4b153ae9a1cb8d56afa511988c149c5c8c9d93bddf"
    )]
    fn test_bip322_virtual_transactions(
        #[case] message: &str,
        #[case] to_spend_txid: &str,
        #[case] to_sign_txid: &str,
    ) {
        let script = script_for_address(P2WPKH).unwrap();
        assert_eq!(
            hex::encode(script.as_bytes()),
            "00142b05d564e6a7a33c087f16e0f730d1440123799d"
        );
        let to_spend = to_spend_tx(message.as_bytes(), script);
        assert_eq!(to_spend.compute_txid().to_string(), to_spend_txid);
        assert_eq!(to_sign_tx(&to_spend).compute_txid().to_string(), to_sign_txid);
    }

    #[test]
    fn test_bip322_p2wpkh_matches_sighash_cache() {
        let payload = bip322_simple("Hello World", P2WPKH).unwrap();
        let script = script_for_address(P2WPKH).unwrap();
        let to_sign = to_sign_tx(&to_spend_tx(b"Hello World", script.clone()));
        let expected = SighashCache::new(&to_sign)
            .p2wpkh_signature_hash(0, &script, Amount::ZERO, EcdsaSighashType::All)
            .unwrap();
        assert_eq!(
            payload.entries[0].message_digest(),
            expected.to_byte_array().to_vec()
        );
    }

    #[test]
    fn test_bip322_p2tr_matches_sighash_cache() {
        let address = "bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0";
        let payload = bip322_simple("Hello World", address).unwrap();
        assert_eq!(payload.entries[0].scheme, SignatureScheme::Secp256k1Schnorr);

        let to_spend = to_spend_tx(b"Hello World", script_for_address(address).unwrap());
        let to_sign = to_sign_tx(&to_spend);
        let expected = SighashCache::new(&to_sign)
            .taproot_key_spend_signature_hash(0, &Prevouts::All(&to_spend.output), TapSighashType::Default)
            .unwrap();
        assert_eq!(
            payload.entries[0].message_digest(),
            expected.to_byte_array().to_vec()
        );
    }

    #[test]
    fn test_bip322_rejects_legacy_address() {
        let err = bip322_simple("hi", "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2").unwrap_err();
        assert!(matches!(err, WasmWalletError::UnsupportedChainVariant(_)));
    }

    #[test]
    fn test_bip137_header() {
        let mut signature = vec![0u8; 64];
        signature.push(1);
        let options = BtcSigOptions::default();

        let decode = |s: String| crate::primitives::bytes::decode_base64(&s).unwrap()[0];
        assert_eq!(decode(bip137_signature(&signature, Some(P2WPKH), &options).unwrap()), 40);
        assert_eq!(decode(bip137_signature(&signature, None, &options).unwrap()), 32);
        let electrum = BtcSigOptions { no_script_type: true };
        assert_eq!(decode(bip137_signature(&signature, Some(P2WPKH), &electrum).unwrap()), 32);
        assert!(bip137_signature(&signature[..64], None, &options).is_err());
    }
}
