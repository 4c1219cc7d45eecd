//! WASM bindings
//!
//! Thin `#[wasm_bindgen]` namespaces over the Rust API. Values cross the
//! boundary through serde-wasm-bindgen; errors become `js_sys::Error`.

pub mod dapp;
pub mod encoder;
pub mod message;
pub mod selection;

pub use dapp::DappNamespace;
pub use encoder::EncoderNamespace;
pub use message::MessageNamespace;
pub use selection::SelectionNamespace;

use crate::config::CoreConfig;
use crate::error::{Result, WasmWalletError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::JsValue;

pub(crate) fn from_js<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<T> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| WasmWalletError::Validation(format!("Invalid {}: {}", what, e)))
}

/// Plain JS objects rather than `Map`s, so results read naturally from JS
pub(crate) fn to_js<T: Serialize>(value: &T) -> Result<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| WasmWalletError::Validation(format!("Serialization error: {}", e)))
}

/// `undefined` and `null` mean the default configuration
pub(crate) fn config_from_js(config: Option<JsValue>) -> Result<CoreConfig> {
    match config {
        Some(value) if !value.is_undefined() && !value.is_null() => from_js(value, "config"),
        _ => Ok(CoreConfig::default()),
    }
}
