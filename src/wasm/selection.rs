//! Coin selection for JS callers

use super::{from_js, to_js};
use crate::chains::utxo::{UtxoNetwork, UtxoTransaction};
use crate::config::SelectionPolicy;
use crate::error::WasmWalletError;
use crate::selection::{select, FeeRate, SelectionResult, SelectionStrategy, SpendableUnit, TargetOutput};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectionRequest {
    units: Vec<SpendableUnit>,
    outputs: Vec<TargetOutput>,
    fee_rate: FeeRate,
    #[serde(default)]
    strategy: SelectionStrategy,
    /// Network preset for the policy when `policy` is absent
    #[serde(default)]
    network: Option<UtxoNetwork>,
    #[serde(default)]
    policy: Option<SelectionPolicy>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildRequest {
    selection: SelectionResult,
    network: UtxoNetwork,
    fee_rate: FeeRate,
    #[serde(default)]
    change_address: Option<String>,
}

#[wasm_bindgen]
pub struct SelectionNamespace;

#[wasm_bindgen]
impl SelectionNamespace {
    /// `{ units, outputs, feeRate, strategy?, network?, policy? }`
    #[wasm_bindgen(js_name = selectCoins)]
    pub fn select_coins(request: JsValue) -> Result<JsValue, WasmWalletError> {
        let request: SelectionRequest = from_js(request, "selection request")?;
        let policy = match (request.policy, request.network) {
            (Some(policy), _) => policy,
            (None, Some(network)) => SelectionPolicy::for_network(network),
            (None, None) => SelectionPolicy::default(),
        };
        let result = select(
            &request.units,
            &request.outputs,
            request.fee_rate,
            request.strategy,
            &policy,
        )?;
        to_js(&result)
    }

    /// Turn a selection result into a BTC transaction intent
    #[wasm_bindgen(js_name = buildTransaction)]
    pub fn build_transaction(request: JsValue) -> Result<JsValue, WasmWalletError> {
        let request: BuildRequest = from_js(request, "build request")?;
        let tx = UtxoTransaction::from_selection(
            &request.selection,
            request.network,
            request.fee_rate,
            request.change_address.as_deref(),
        )?;
        to_js(&tx)
    }
}
