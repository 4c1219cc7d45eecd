//! TronLink provider methods
//!
//! `sign` receives a TronWeb transaction object. It is re-encoded from its
//! fields and, when the dApp also sent `raw_data_hex`, the two must agree.

use super::{
    field, opt_quantity, opt_str_field, quantity, str_field, to_u64, Capability, DappRequest,
    NormalizedRequest, ProviderApi, RequestContext,
};
use crate::chain::ChainFamily;
use crate::chains::tron::address::parse_address;
use crate::chains::tron::{check_raw_data_hex, RefBlock, TronContract, TronTransaction};
use crate::config::TronConfig;
use crate::error::{Result, WasmWalletError};
use crate::model::message::{MessageKind, MessagePayload, UnsignedMessage};
use crate::model::transaction::UnsignedTransaction;
use crate::primitives::bytes::decode_hex;
use serde_json::Value;

pub struct TronProvider {
    config: TronConfig,
}

fn u64_field(value: &Value, key: &str) -> Result<u64> {
    let raw = field(value, key).ok_or_else(|| WasmWalletError::Validation(format!("{} is required", key)))?;
    to_u64(quantity(raw, key)?, key)
}

fn opt_u64_field(value: &Value, key: &str) -> Result<Option<u64>> {
    opt_quantity(value, key)?.map(|v| to_u64(v, key)).transpose()
}

impl TronProvider {
    pub fn new(config: TronConfig) -> Self {
        TronProvider { config }
    }

    fn contract(raw_data: &Value) -> Result<TronContract> {
        let contract = match field(raw_data, "contract") {
            Some(Value::Array(contracts)) if contracts.len() == 1 => &contracts[0],
            _ => return Err("raw_data must hold exactly one contract".into()),
        };
        let kind = str_field(contract, "type")?;
        let value = field(contract, "parameter")
            .and_then(|p| field(p, "value"))
            .ok_or_else(|| WasmWalletError::from("contract parameter value is required"))?;
        match kind {
            "TransferContract" => Ok(TronContract::Transfer {
                owner: str_field(value, "owner_address")?.to_string(),
                to: str_field(value, "to_address")?.to_string(),
                amount: u64_field(value, "amount")?,
            }),
            "TriggerSmartContract" => Ok(TronContract::TriggerSmartContract {
                owner: str_field(value, "owner_address")?.to_string(),
                contract: str_field(value, "contract_address")?.to_string(),
                call_value: opt_u64_field(value, "call_value")?.unwrap_or_default(),
                data: decode_hex(str_field(value, "data")?)?,
            }),
            other => Err(WasmWalletError::unsupported(format!("Tron contract type {}", other))),
        }
    }

    fn owner(contract: &TronContract) -> &str {
        match contract {
            TronContract::Transfer { owner, .. }
            | TronContract::TriggerSmartContract { owner, .. }
            | TronContract::Trc20Transfer { owner, .. } => owner,
        }
    }

    fn transaction(&self, tx: &Value, ctx: &RequestContext) -> Result<TronTransaction> {
        let raw_data =
            field(tx, "raw_data").ok_or_else(|| WasmWalletError::from("raw_data is required"))?;
        let contract = Self::contract(raw_data)?;
        if parse_address(Self::owner(&contract))? != parse_address(&ctx.address)? {
            return Err(WasmWalletError::InvalidFieldCombination(
                "owner_address is not the connected account".to_string(),
            ));
        }
        let memo = opt_str_field(raw_data, "data")?
            .map(|hex| {
                String::from_utf8(decode_hex(hex)?)
                    .map_err(|_| WasmWalletError::from("raw_data.data is not UTF-8"))
            })
            .transpose()?;

        let transaction = TronTransaction {
            contract,
            ref_block: RefBlock::Raw {
                ref_block_bytes: decode_hex(str_field(raw_data, "ref_block_bytes")?)?,
                ref_block_hash: decode_hex(str_field(raw_data, "ref_block_hash")?)?,
            },
            expiration: opt_u64_field(raw_data, "expiration")?,
            timestamp: opt_u64_field(raw_data, "timestamp")?,
            fee_limit: opt_u64_field(raw_data, "fee_limit")?,
            memo,
        }
        .resolve(ctx.now, &self.config);

        if let Some(raw_data_hex) = opt_str_field(tx, "raw_data_hex")? {
            check_raw_data_hex(&transaction, raw_data_hex)?;
        }
        Ok(transaction)
    }
}

impl ProviderApi for TronProvider {
    fn chain(&self) -> ChainFamily {
        ChainFamily::Tron
    }

    fn capability(&self, method: &str) -> Option<Capability> {
        match method {
            "tron_requestAccounts" => Some(Capability::RequestAccounts),
            "signMessageV2" => Some(Capability::SignMessage),
            "sign" => Some(Capability::SignTransaction),
            _ => None,
        }
    }

    fn sign_message(&self, request: &DappRequest, _ctx: &RequestContext) -> Result<NormalizedRequest> {
        let message = request
            .param(0)?
            .as_str()
            .ok_or_else(|| WasmWalletError::from("signMessageV2 message must be a string"))?;
        let message =
            UnsignedMessage::new(MessageKind::TronSignMessageV2, message, MessagePayload::Tron)?;
        Ok(NormalizedRequest::SignMessage { message })
    }

    fn sign_transaction(&self, request: &DappRequest, ctx: &RequestContext) -> Result<NormalizedRequest> {
        let transaction = UnsignedTransaction::Tron(self.transaction(request.param(0)?, ctx)?);
        transaction.validate()?;
        Ok(NormalizedRequest::SignTransaction {
            transaction,
            broadcast: false,
        })
    }
}
