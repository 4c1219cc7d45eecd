use super::{config_from_js, from_js, to_js};
use crate::chain::ChainFamily;
use crate::dapp::{DappRequest, ProviderRegistry, RequestContext};
use crate::error::WasmWalletError;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct DappNamespace;

#[wasm_bindgen]
impl DappNamespace {
    /// Normalize `{ method, params }` from a dApp into a message or transaction intent
    #[wasm_bindgen(js_name = normalizeRequest)]
    pub fn normalize_request(
        chain: &str,
        request: JsValue,
        context: JsValue,
        config: Option<JsValue>,
    ) -> Result<JsValue, WasmWalletError> {
        let chain: ChainFamily = chain.parse()?;
        let request: DappRequest = from_js(request, "dApp request")?;
        let context: RequestContext = from_js(context, "request context")?;
        let registry = ProviderRegistry::new(&config_from_js(config)?);
        to_js(&registry.normalize(chain, &request, &context)?)
    }
}
