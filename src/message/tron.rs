//! TRON `signMessageV2`: the EIP-191 layout with TRON's prefix over the
//! UTF-8 text, never hex-decoded

use super::evm::length_prefixed;
use crate::chain::ChainFamily;
use crate::error::Result;
use crate::model::signing::{DigestAlgorithm, SignatureScheme, SigningPayload};

pub const TRON_MESSAGE_PREFIX: &str = "\x19TRON Signed Message:\n";

pub fn sign_message_v2(message: &str) -> Result<SigningPayload> {
    Ok(SigningPayload::single(
        ChainFamily::Tron,
        length_prefixed(TRON_MESSAGE_PREFIX, message.as_bytes()),
        DigestAlgorithm::Keccak256,
        SignatureScheme::Secp256k1Ecdsa,
    )
    .with_preview(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message() {
        let payload = sign_message_v2("Hello World").unwrap();
        assert_eq!(
            payload.preimage().unwrap(),
            b"\x19TRON Signed Message:\n11Hello World"
        );
        assert_eq!(
            hex::encode(payload.entries[0].message_digest()),
            "a8383a95afcc961b6c36437aff5c8e38a3e35a0ab36ec8630c42fd11f455eac5"
        );
    }

    #[test]
    fn test_hex_looking_message_signs_text() {
        let payload = sign_message_v2("0xdead").unwrap();
        assert_eq!(
            payload.preimage().unwrap(),
            b"\x19TRON Signed Message:\n60xdead"
        );
        assert_eq!(
            hex::encode(payload.entries[0].message_digest()),
            "f92d4ab38dfe9361bfd3586dcadc2dcf72c573a83be1158a4bd6bbd98a930768"
        );
    }
}
