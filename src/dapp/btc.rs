//! Bitcoin wallet provider methods (Unisat-style)

use super::{field, Capability, DappRequest, NormalizedRequest, ProviderApi, RequestContext};
use crate::chain::ChainFamily;
use crate::error::{Result, WasmWalletError};
use crate::model::message::{BtcMessagePayload, BtcSigOptions, MessageKind, MessagePayload, UnsignedMessage};
use serde_json::Value;

pub struct BtcProvider;

impl ProviderApi for BtcProvider {
    fn chain(&self) -> ChainFamily {
        ChainFamily::Btc
    }

    fn capability(&self, method: &str) -> Option<Capability> {
        match method {
            "requestAccounts" | "getAccounts" => Some(Capability::RequestAccounts),
            "signMessage" => Some(Capability::SignMessage),
            "signPsbt" => Some(Capability::SignTransaction),
            "sendBitcoin" => Some(Capability::SendTransaction),
            _ => None,
        }
    }

    /// `[message, type]` or `{ message, type }`; `type` defaults to `ecdsa`
    fn sign_message(&self, request: &DappRequest, ctx: &RequestContext) -> Result<NormalizedRequest> {
        let first = request.param(0)?;
        let (message, kind) = match first {
            Value::String(message) => (message.as_str(), request.param(1).ok()),
            object => (
                field(object, "message")
                    .and_then(Value::as_str)
                    .ok_or_else(|| WasmWalletError::from("message must be a string"))?,
                field(object, "type"),
            ),
        };
        let kind = match kind.and_then(Value::as_str) {
            None | Some("ecdsa") => MessageKind::BtcEcdsa,
            Some("bip322-simple") => MessageKind::Bip322Simple,
            Some(other) => {
                return Err(WasmWalletError::Validation(format!(
                    "unknown signature type {}",
                    other
                )))
            }
        };
        let message = UnsignedMessage::new(
            kind,
            message,
            MessagePayload::Btc(BtcMessagePayload {
                sig_options: BtcSigOptions::default(),
                is_from_dapp: true,
                address: Some(ctx.address.clone()),
            }),
        )?;
        Ok(NormalizedRequest::SignMessage { message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dapp::tests::context;
    use serde_json::json;

    const ADDRESS: &str = "bc1q9vza2e8x573nczrlzms0wvx3gsqjx7vavgkx0l";

    #[test]
    fn test_sign_message_types() {
        for (params, kind) in [
            (json!(["hi"]), MessageKind::BtcEcdsa),
            (json!(["hi", "bip322-simple"]), MessageKind::Bip322Simple),
            (json!({"message": "hi", "type": "ecdsa"}), MessageKind::BtcEcdsa),
        ] {
            let result = BtcProvider
                .normalize(&DappRequest::new("signMessage", params), &context(ADDRESS))
                .unwrap();
            let NormalizedRequest::SignMessage { message } = result else {
                panic!("expected a message");
            };
            assert_eq!(message.kind, kind);
            assert_eq!(message.message, "hi");
        }

        let unknown = DappRequest::new("signMessage", json!(["hi", "schnorr"]));
        assert!(BtcProvider.normalize(&unknown, &context(ADDRESS)).is_err());
    }

    #[test]
    fn test_psbt_and_send_unsupported() {
        for method in ["signPsbt", "sendBitcoin"] {
            let err = BtcProvider
                .normalize(&DappRequest::new(method, json!(["70736274ff"])), &context(ADDRESS))
                .unwrap_err();
            assert!(matches!(err, WasmWalletError::UnsupportedChainVariant(_)));
        }
    }
}
