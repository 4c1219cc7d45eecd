//! Transaction encoding for JS callers

use super::{config_from_js, from_js, to_js};
use crate::error::{Result, WasmWalletError};
use crate::model::signing::Encoder;
use crate::model::transaction::UnsignedTransaction;
use crate::primitives::time::unix_now_millis;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct EncoderNamespace;

fn prepared(intent: JsValue, config: Option<JsValue>) -> Result<UnsignedTransaction> {
    let config = config_from_js(config)?;
    let tx: UnsignedTransaction = from_js(intent, "transaction intent")?;
    let tx = tx.prepare(unix_now_millis(), &config);
    tx.validate()?;
    Ok(tx)
}

#[wasm_bindgen]
impl EncoderNamespace {
    /// Fill clock and configuration defaults (TON timeout, Tron timestamps).
    ///
    /// Pass the returned intent to `buildSigningPayload` and
    /// `assembleSignedPayload` so both see the same values.
    #[wasm_bindgen(js_name = prepareTransaction)]
    pub fn prepare_transaction(
        intent: JsValue,
        config: Option<JsValue>,
    ) -> std::result::Result<JsValue, WasmWalletError> {
        to_js(&prepared(intent, config)?)
    }

    #[wasm_bindgen(js_name = buildSigningPayload)]
    pub fn build_signing_payload(
        intent: JsValue,
        config: Option<JsValue>,
    ) -> std::result::Result<JsValue, WasmWalletError> {
        let payload = prepared(intent, config)?.build_signing_payload()?;
        to_js(&payload)
    }

    /// `signatures` is an array of `Uint8Array`, ordered like the payload entries
    #[wasm_bindgen(js_name = assembleSignedPayload)]
    pub fn assemble_signed_payload(
        intent: JsValue,
        signatures: js_sys::Array,
        config: Option<JsValue>,
    ) -> std::result::Result<JsValue, WasmWalletError> {
        let signatures: Vec<Vec<u8>> = signatures
            .iter()
            .map(|sig| js_sys::Uint8Array::new(&sig).to_vec())
            .collect();
        let signed = prepared(intent, config)?.assemble_signed_payload(&signatures)?;
        to_js(&signed)
    }
}
