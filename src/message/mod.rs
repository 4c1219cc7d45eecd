//! Message-signing preimages
//!
//! [`build_message_payload`] turns an [`UnsignedMessage`] into the bytes the
//! signer hashes, following each ecosystem's prefix convention. Like the
//! transaction encoders it never applies the outer digest itself.

pub mod btc;
pub mod cosmos;
pub mod evm;
pub mod sol;
pub mod ton;
pub mod tron;

use crate::chain::ChainFamily;
use crate::error::{Result, WasmWalletError};
use crate::model::message::{MessageKind, MessagePayload, UnsignedMessage};
use crate::model::signing::{DigestAlgorithm, SignatureScheme, SigningPayload};
use crate::primitives::bytes::strip_0x;

/// `0x`-prefixed hex is signed as bytes, anything else as UTF-8
pub(crate) fn message_bytes(message: &str) -> Vec<u8> {
    if message.starts_with("0x") {
        if let Ok(bytes) = hex::decode(strip_0x(message)) {
            return bytes;
        }
    }
    message.as_bytes().to_vec()
}

fn common_scheme(chain: ChainFamily) -> SignatureScheme {
    match chain {
        ChainFamily::Btc | ChainFamily::Evm | ChainFamily::Tron | ChainFamily::Cosmos => {
            SignatureScheme::Secp256k1Ecdsa
        }
        ChainFamily::Ton | ChainFamily::Sol | ChainFamily::Dot => SignatureScheme::Ed25519,
    }
}

pub fn build_message_payload(msg: &UnsignedMessage) -> Result<SigningPayload> {
    msg.validate()?;
    let text = msg.message.as_str();

    let payload = match (msg.kind, &msg.payload) {
        (MessageKind::PersonalSign, _) => evm::personal_sign(text)?,
        (MessageKind::EthSign, _) => evm::eth_sign(text)?,
        (MessageKind::TypedDataV3, _) => evm::typed_data(text, evm::TypedDataVersion::V3)?,
        (MessageKind::TypedDataV4, _) => evm::typed_data(text, evm::TypedDataVersion::V4)?,
        (MessageKind::BtcEcdsa, _) => btc::bip137(text)?,
        (MessageKind::Bip322Simple, MessagePayload::Btc(btc)) => {
            let address = btc.address.as_deref().ok_or_else(|| {
                WasmWalletError::Validation("BIP-322 signing requires the signer address".into())
            })?;
            btc::bip322_simple(text, address)?
        }
        (MessageKind::TronSignMessageV2, _) => tron::sign_message_v2(text)?,
        (MessageKind::SolOffchain, MessagePayload::Sol(sol)) => sol::offchain_message(text, sol)?,
        (MessageKind::TonSignProof, MessagePayload::Ton(t)) => ton::sign_proof(text, t)?,
        (MessageKind::TonSignDataV1, MessagePayload::Ton(t)) => ton::sign_data_v1(t)?,
        (MessageKind::TonSignData, MessagePayload::Ton(t)) => ton::sign_data_legacy(t)?,
        (MessageKind::CosmosAdr36, MessagePayload::Cosmos(c)) => cosmos::adr36(text, c)?,
        (MessageKind::SignMessage, MessagePayload::Common { chain: Some(chain) }) => {
            SigningPayload::single(
                *chain,
                text.as_bytes().to_vec(),
                DigestAlgorithm::None,
                common_scheme(*chain),
            )
            .with_preview(text.to_string())
        }
        (kind, payload) => {
            return Err(WasmWalletError::InvalidFieldCombination(format!(
                "message type {:?} cannot carry {:?}",
                kind, payload
            )))
        }
    };

    tracing::debug!(
        kind = ?msg.kind,
        chain = payload.chain.as_str(),
        entries = payload.entries.len(),
        "built message payload"
    );
    Ok(payload)
}
