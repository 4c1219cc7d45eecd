use super::{from_js, to_js};
use crate::error::WasmWalletError;
use crate::message::{btc, build_message_payload};
use crate::model::message::{BtcSigOptions, UnsignedMessage};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct MessageNamespace;

#[wasm_bindgen]
impl MessageNamespace {
    /// Preimage, digest and scheme for an unsigned message
    #[wasm_bindgen(js_name = buildMessagePayload)]
    pub fn build_message_payload(message: JsValue) -> Result<JsValue, WasmWalletError> {
        let message: UnsignedMessage = from_js(message, "message")?;
        to_js(&build_message_payload(&message)?)
    }

    /// Base64 BIP-137 signature from a 65-byte `r || s || recoveryId`
    #[wasm_bindgen(js_name = bip137Signature)]
    pub fn bip137_signature(
        signature: &[u8],
        address: Option<String>,
        no_script_type: bool,
    ) -> Result<String, WasmWalletError> {
        btc::bip137_signature(
            signature,
            address.as_deref(),
            &BtcSigOptions { no_script_type },
        )
    }
}
