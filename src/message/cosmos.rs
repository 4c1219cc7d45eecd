//! ADR-36 arbitrary message signing over an amino `StdSignDoc`

use crate::chain::ChainFamily;
use crate::chains::cosmos::{amino_json, AminoMsg, StdFee, StdSignDoc};
use crate::error::Result;
use crate::model::message::CosmosMessagePayload;
use crate::model::signing::{DigestAlgorithm, SignatureScheme, SigningPayload};
use crate::primitives::bytes::encode_base64;
use serde::Serialize;

const MSG_SIGN_DATA: &str = "sign/MsgSignData";

#[derive(Serialize)]
struct MsgSignData<'a> {
    signer: &'a str,
    data: String,
}

/// Sign doc with every chain-specific field zeroed; `chain_id` is always empty
pub fn sign_doc(message: &str, signer: &str) -> Result<StdSignDoc> {
    let value = serde_json::to_value(MsgSignData {
        signer,
        data: encode_base64(message.as_bytes()),
    })?;
    Ok(StdSignDoc {
        chain_id: String::new(),
        account_number: "0".to_string(),
        sequence: "0".to_string(),
        fee: StdFee {
            amount: Vec::new(),
            gas: "0".to_string(),
            payer: None,
            granter: None,
        },
        msgs: vec![AminoMsg {
            type_url: MSG_SIGN_DATA.to_string(),
            value,
        }],
        memo: String::new(),
        timeout_height: None,
    })
}

pub fn adr36(message: &str, payload: &CosmosMessagePayload) -> Result<SigningPayload> {
    let doc = sign_doc(message, &payload.signer)?;
    Ok(SigningPayload::single(
        ChainFamily::Cosmos,
        amino_json(&doc)?,
        DigestAlgorithm::Sha256,
        SignatureScheme::Secp256k1Ecdsa,
    )
    .with_preview(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adr36_sign_doc() {
        let payload = CosmosMessagePayload {
            signer: "cosmos1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5lzv7xu".to_string(),
            chain_id: Some("cosmoshub-4".to_string()),
        };
        let signed = adr36("Hello World", &payload).unwrap();
        assert_eq!(
            std::str::from_utf8(signed.preimage().unwrap()).unwrap(),
            r#"{"account_number":"0","chain_id":"","fee":{"amount":[],"gas":"0"},"memo":"","msgs":[{"type":"sign/MsgSignData","value":{"data":"SGVsbG8gV29ybGQ=","signer":"cosmos1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5lzv7xu"}}],"sequence":"0"}"#
        );
        assert_eq!(
            hex::encode(signed.entries[0].message_digest()),
            "47d9c2d1839cde96ed14c73423a2c0110f07720b1c3b2390e8dc93fc8e5fa7ab"
        );
    }
}
