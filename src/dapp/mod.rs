//! dApp request normalization
//!
//! Providers take a loosely shaped JSON-RPC request from an injected provider
//! and turn it into a validated [`UnsignedMessage`] or [`UnsignedTransaction`].
//! Loose `serde_json::Value`s stop at this module.

pub mod btc;
pub mod cosmos;
pub mod evm;
pub mod ton;
pub mod tron;

use crate::chain::ChainFamily;
use crate::chains::ton::WalletVersion;
use crate::config::CoreConfig;
use crate::error::{Result, WasmWalletError};
use crate::model::message::UnsignedMessage;
use crate::model::transaction::UnsignedTransaction;
use crate::primitives::amount::{opt_u128_str, opt_u64_str, parse_uint};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub use btc::BtcProvider;
pub use cosmos::CosmosProvider;
pub use evm::EvmProvider;
pub use ton::TonProvider;
pub use tron::TronProvider;

/// What a dApp method asks the wallet to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    RequestAccounts,
    SignTransaction,
    SignMessage,
    SendTransaction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DappRequest {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl DappRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        DappRequest {
            method: method.into(),
            params,
        }
    }

    /// Positional parameter `index`; a bare object counts as position 0
    pub fn param(&self, index: usize) -> Result<&Value> {
        let value = match &self.params {
            Value::Array(items) => items.get(index),
            other if index == 0 && !other.is_null() => Some(other),
            _ => None,
        };
        value.ok_or_else(|| {
            WasmWalletError::Validation(format!("{} is missing parameter {}", self.method, index))
        })
    }
}

/// TON wallet contract facts needed to build a transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TonWalletState {
    pub version: WalletVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<u32>,
    /// base64 StateInit BoC, attached while the wallet is undeployed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_init: Option<String>,
}

/// Point-in-time account facts from the account-state provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountState {
    /// EVM nonce or TON seqno
    #[serde(skip_serializing_if = "Option::is_none", with = "opt_u64_str")]
    pub nonce: Option<u64>,
    /// EVM chain id (decimal or hex) or Cosmos chain id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", with = "opt_u64_str")]
    pub gas_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", with = "opt_u128_str")]
    pub gas_price: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none", with = "opt_u128_str")]
    pub max_fee_per_gas: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none", with = "opt_u128_str")]
    pub max_priority_fee_per_gas: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ton_wallet: Option<TonWalletState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub origin: String,
    /// The connected account
    pub address: String,
    /// hex or base64
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Unix milliseconds
    pub now: u64,
    #[serde(default)]
    pub account: AccountState,
}

impl RequestContext {
    pub fn now_secs(&self) -> u64 {
        self.now / 1000
    }

    /// Origin without its `http://` or `https://` scheme
    pub fn app_domain(&self) -> &str {
        self.origin
            .strip_prefix("https://")
            .or_else(|| self.origin.strip_prefix("http://"))
            .unwrap_or(&self.origin)
    }
}

/// Outcome of normalizing a dApp request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NormalizedRequest {
    #[serde(rename_all = "camelCase")]
    Accounts {
        chain: ChainFamily,
        accounts: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        public_key: Option<String>,
    },
    SignMessage { message: UnsignedMessage },
    /// `broadcast` is set for send-style methods
    SignTransaction {
        transaction: UnsignedTransaction,
        broadcast: bool,
    },
}

/// One ecosystem's injected provider
pub trait ProviderApi {
    fn chain(&self) -> ChainFamily;

    /// Map a method name to what it asks for; `None` for unknown methods
    fn capability(&self, method: &str) -> Option<Capability>;

    fn request_accounts(
        &self,
        _request: &DappRequest,
        ctx: &RequestContext,
    ) -> Result<NormalizedRequest> {
        if ctx.address.is_empty() {
            return Err("no connected account".into());
        }
        Ok(NormalizedRequest::Accounts {
            chain: self.chain(),
            accounts: vec![ctx.address.clone()],
            public_key: ctx.public_key.clone(),
        })
    }

    fn sign_message(&self, request: &DappRequest, ctx: &RequestContext)
        -> Result<NormalizedRequest>;

    fn sign_transaction(
        &self,
        request: &DappRequest,
        _ctx: &RequestContext,
    ) -> Result<NormalizedRequest> {
        Err(WasmWalletError::unsupported(format!(
            "{} is not supported for {}",
            request.method,
            self.chain()
        )))
    }

    fn send_transaction(
        &self,
        request: &DappRequest,
        _ctx: &RequestContext,
    ) -> Result<NormalizedRequest> {
        Err(WasmWalletError::unsupported(format!(
            "{} is not supported for {}",
            request.method,
            self.chain()
        )))
    }

    fn normalize(&self, request: &DappRequest, ctx: &RequestContext) -> Result<NormalizedRequest> {
        let result = match self.capability(&request.method) {
            Some(Capability::RequestAccounts) => self.request_accounts(request, ctx),
            Some(Capability::SignMessage) => self.sign_message(request, ctx),
            Some(Capability::SignTransaction) => self.sign_transaction(request, ctx),
            Some(Capability::SendTransaction) => self.send_transaction(request, ctx),
            None => Err(WasmWalletError::unsupported(format!(
                "unknown {} method {}",
                self.chain(),
                request.method
            ))),
        };
        if let Err(err) = &result {
            tracing::warn!(
                chain = self.chain().as_str(),
                method = %request.method,
                origin = %ctx.origin,
                error = %err,
                "rejected dApp request"
            );
        }
        result
    }
}

/// Providers keyed by chain family
pub struct ProviderRegistry {
    providers: BTreeMap<ChainFamily, Box<dyn ProviderApi>>,
}

impl ProviderRegistry {
    pub fn empty() -> Self {
        ProviderRegistry {
            providers: BTreeMap::new(),
        }
    }

    /// All built-in providers
    pub fn new(config: &CoreConfig) -> Self {
        let mut registry = ProviderRegistry::empty();
        registry.register(Box::new(EvmProvider));
        registry.register(Box::new(TonProvider::new(config.ton.clone())));
        registry.register(Box::new(CosmosProvider));
        registry.register(Box::new(TronProvider::new(config.tron.clone())));
        registry.register(Box::new(BtcProvider));
        registry
    }

    /// Replaces any provider already registered for the same chain
    pub fn register(&mut self, provider: Box<dyn ProviderApi>) {
        self.providers.insert(provider.chain(), provider);
    }

    pub fn get(&self, chain: ChainFamily) -> Option<&dyn ProviderApi> {
        self.providers.get(&chain).map(|p| p.as_ref())
    }

    pub fn normalize(
        &self,
        chain: ChainFamily,
        request: &DappRequest,
        ctx: &RequestContext,
    ) -> Result<NormalizedRequest> {
        let provider = self.get(chain).ok_or_else(|| {
            tracing::warn!(chain = chain.as_str(), method = %request.method, "no dApp provider");
            WasmWalletError::unsupported(format!("no dApp provider for {}", chain))
        })?;
        provider.normalize(request, ctx)
    }
}

pub(crate) fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| !v.is_null())
}

pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Result<&'a str> {
    match field(value, key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(WasmWalletError::Validation(format!("{} must be a string", key))),
        None => Err(WasmWalletError::Validation(format!("{} is required", key))),
    }
}

pub(crate) fn opt_str_field<'a>(value: &'a Value, key: &str) -> Result<Option<&'a str>> {
    match field(value, key) {
        Some(_) => str_field(value, key).map(Some),
        None => Ok(None),
    }
}

/// Integer given as a JSON number or a decimal/hex string
pub(crate) fn quantity(value: &Value, key: &str) -> Result<u128> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| WasmWalletError::Validation(format!("{} must be a non-negative integer", key))),
        Value::String(s) => parse_uint(s).map_err(|e| WasmWalletError::Validation(format!("{}: {}", key, e))),
        _ => Err(WasmWalletError::Validation(format!("{} must be a number or string", key))),
    }
}

pub(crate) fn opt_quantity(value: &Value, key: &str) -> Result<Option<u128>> {
    field(value, key).map(|v| quantity(v, key)).transpose()
}

pub(crate) fn to_u64(value: u128, key: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| WasmWalletError::Validation(format!("{} exceeds uint64", key)))
}
