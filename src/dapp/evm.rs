//! EIP-1193 provider methods

use super::{
    field, opt_quantity, opt_str_field, quantity, to_u64, Capability, DappRequest,
    NormalizedRequest, ProviderApi, RequestContext,
};
use crate::chain::ChainFamily;
use crate::chains::evm::{AccessListItem, EvmFee, EvmTransaction};
use crate::error::{Result, WasmWalletError};
use crate::model::message::{MessageKind, MessagePayload, UnsignedMessage};
use crate::model::transaction::UnsignedTransaction;
use crate::primitives::amount::{parse_u256, parse_uint};
use crate::primitives::bytes::decode_hex;
use alloy_primitives::{Address, Bytes, U256};
use serde_json::Value;

pub struct EvmProvider;

fn same_address(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn expect_account(address: &str, ctx: &RequestContext) -> Result<()> {
    if !same_address(address, &ctx.address) {
        return Err(WasmWalletError::InvalidFieldCombination(format!(
            "address {} is not the connected account",
            address
        )));
    }
    Ok(())
}

fn param_str<'a>(request: &'a DappRequest, index: usize) -> Result<&'a str> {
    request.param(index)?.as_str().ok_or_else(|| {
        WasmWalletError::Validation(format!("{} parameter {} must be a string", request.method, index))
    })
}

impl EvmProvider {
    fn chain_id(tx: &Value, ctx: &RequestContext) -> Result<u64> {
        let connected = ctx
            .account
            .chain_id
            .as_deref()
            .map(parse_uint)
            .transpose()
            .map_err(WasmWalletError::Validation)?;
        let requested = opt_quantity(tx, "chainId")?;
        let chain_id = match (requested, connected) {
            (Some(r), Some(c)) if r != c => {
                return Err(WasmWalletError::InvalidFieldCombination(format!(
                    "chainId {} does not match the connected chain {}",
                    r, c
                )))
            }
            (Some(id), _) | (None, Some(id)) => id,
            (None, None) => return Err("chainId is required".into()),
        };
        to_u64(chain_id, "chainId")
    }

    fn fee(tx: &Value, ctx: &RequestContext) -> Result<EvmFee> {
        let access_list: Vec<AccessListItem> = match field(tx, "accessList") {
            Some(list) => serde_json::from_value(list.clone())?,
            None => Vec::new(),
        };
        let gas_price = opt_quantity(tx, "gasPrice")?;
        let max_fee = opt_quantity(tx, "maxFeePerGas")?;
        let max_priority = opt_quantity(tx, "maxPriorityFeePerGas")?;
        let account = &ctx.account;

        match (gas_price, max_fee.or(max_priority)) {
            (Some(_), Some(_)) => Err(WasmWalletError::InvalidFieldCombination(
                "gasPrice cannot be combined with EIP-1559 fee fields".to_string(),
            )),
            (Some(gas_price), None) if access_list.is_empty() => Ok(EvmFee::Legacy { gas_price }),
            (Some(gas_price), None) => Ok(EvmFee::Eip2930 {
                gas_price,
                access_list,
            }),
            (None, Some(_)) => Ok(EvmFee::Eip1559 {
                max_fee_per_gas: max_fee
                    .or(account.max_fee_per_gas)
                    .ok_or_else(|| WasmWalletError::from("maxFeePerGas is required"))?,
                max_priority_fee_per_gas: max_priority
                    .or(account.max_priority_fee_per_gas)
                    .unwrap_or_default(),
                access_list,
            }),
            (None, None) => match (account.max_fee_per_gas, account.gas_price) {
                (Some(max_fee_per_gas), _) => Ok(EvmFee::Eip1559 {
                    max_fee_per_gas,
                    max_priority_fee_per_gas: account.max_priority_fee_per_gas.unwrap_or_default(),
                    access_list,
                }),
                (None, Some(gas_price)) => Ok(EvmFee::Legacy { gas_price }),
                (None, None) => Err("no fee fields and no fee defaults".into()),
            },
        }
    }

    fn transaction(request: &DappRequest, ctx: &RequestContext) -> Result<UnsignedTransaction> {
        let tx = request.param(0)?;
        if let Some(from) = opt_str_field(tx, "from")? {
            expect_account(from, ctx)?;
        }
        let to = opt_str_field(tx, "to")?
            .map(|to| {
                to.parse::<Address>()
                    .map_err(|e| WasmWalletError::Validation(format!("Invalid to address: {}", e)))
            })
            .transpose()?;
        let value = match field(tx, "value") {
            Some(Value::String(v)) => parse_u256(v).map_err(WasmWalletError::Validation)?,
            Some(other) => U256::from(quantity(other, "value")?),
            None => U256::ZERO,
        };
        let data = match opt_str_field(tx, "data")?.or(opt_str_field(tx, "input")?) {
            Some(hex) => Bytes::from(decode_hex(hex)?),
            None => Bytes::new(),
        };
        let gas_limit = match opt_quantity(tx, "gas")?.or(opt_quantity(tx, "gasLimit")?) {
            Some(gas) => to_u64(gas, "gas")?,
            None => ctx
                .account
                .gas_limit
                .ok_or_else(|| WasmWalletError::from("gas limit is required"))?,
        };
        let nonce = match opt_quantity(tx, "nonce")? {
            Some(nonce) => to_u64(nonce, "nonce")?,
            None => ctx
                .account
                .nonce
                .ok_or_else(|| WasmWalletError::from("nonce is required"))?,
        };

        let transaction = UnsignedTransaction::Evm(EvmTransaction {
            chain_id: Self::chain_id(tx, ctx)?,
            nonce,
            gas_limit,
            to,
            value,
            data,
            fee: Self::fee(tx, ctx)?,
        });
        transaction.validate()?;
        Ok(transaction)
    }
}

impl ProviderApi for EvmProvider {
    fn chain(&self) -> ChainFamily {
        ChainFamily::Evm
    }

    fn capability(&self, method: &str) -> Option<Capability> {
        match method {
            "eth_requestAccounts" | "eth_accounts" => Some(Capability::RequestAccounts),
            "personal_sign" | "eth_sign" | "eth_signTypedData_v3" | "eth_signTypedData_v4" => {
                Some(Capability::SignMessage)
            }
            "eth_signTransaction" => Some(Capability::SignTransaction),
            "eth_sendTransaction" => Some(Capability::SendTransaction),
            _ => None,
        }
    }

    fn sign_message(&self, request: &DappRequest, ctx: &RequestContext) -> Result<NormalizedRequest> {
        let (kind, message) = match request.method.as_str() {
            "personal_sign" => {
                let (first, second) = (param_str(request, 0)?, param_str(request, 1)?);
                // some dApps send [address, message]
                let (message, address) =
                    if same_address(first, &ctx.address) && !same_address(second, &ctx.address) {
                        (second, first)
                    } else {
                        (first, second)
                    };
                expect_account(address, ctx)?;
                (MessageKind::PersonalSign, message.to_string())
            }
            "eth_sign" => {
                expect_account(param_str(request, 0)?, ctx)?;
                (MessageKind::EthSign, param_str(request, 1)?.to_string())
            }
            method => {
                expect_account(param_str(request, 0)?, ctx)?;
                let kind = if method == "eth_signTypedData_v3" {
                    MessageKind::TypedDataV3
                } else {
                    MessageKind::TypedDataV4
                };
                let data = match request.param(1)? {
                    Value::String(s) => s.clone(),
                    other => serde_json::to_string(other)?,
                };
                (kind, data)
            }
        };
        let message = UnsignedMessage::new(kind, message, MessagePayload::Evm)?;
        Ok(NormalizedRequest::SignMessage { message })
    }

    fn sign_transaction(&self, request: &DappRequest, ctx: &RequestContext) -> Result<NormalizedRequest> {
        Ok(NormalizedRequest::SignTransaction {
            transaction: Self::transaction(request, ctx)?,
            broadcast: false,
        })
    }

    fn send_transaction(&self, request: &DappRequest, ctx: &RequestContext) -> Result<NormalizedRequest> {
        Ok(NormalizedRequest::SignTransaction {
            transaction: Self::transaction(request, ctx)?,
            broadcast: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dapp::tests::context;
    use serde_json::json;

    const ACCOUNT: &str = "0x9d8A62f656a8d1615C1294fd71e9CFb3E4855A4F";

    fn ctx() -> RequestContext {
        let mut ctx = context(ACCOUNT);
        ctx.account.chain_id = Some("1".to_string());
        ctx.account.nonce = Some(9);
        ctx.account.gas_limit = Some(21_000);
        ctx.account.max_fee_per_gas = Some(30_000_000_000);
        ctx.account.max_priority_fee_per_gas = Some(1_000_000_000);
        ctx
    }

    fn message_of(result: NormalizedRequest) -> UnsignedMessage {
        match result {
            NormalizedRequest::SignMessage { message } => message,
            other => panic!("unexpected {:?}", other),
        }
    }

    fn evm_of(result: NormalizedRequest) -> (EvmTransaction, bool) {
        match result {
            NormalizedRequest::SignTransaction {
                transaction: UnsignedTransaction::Evm(tx),
                broadcast,
            } => (tx, broadcast),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_personal_sign_either_order() {
        let lower = ACCOUNT.to_lowercase();
        for params in [json!(["0x68656c6c6f", lower]), json!([lower, "0x68656c6c6f"])] {
            let result = EvmProvider
                .normalize(&DappRequest::new("personal_sign", params), &ctx())
                .unwrap();
            let message = message_of(result);
            assert_eq!(message.kind, MessageKind::PersonalSign);
            assert_eq!(message.message, "0x68656c6c6f");
        }
    }

    #[test]
    fn test_sign_for_other_account_rejected() {
        let request = DappRequest::new(
            "personal_sign",
            json!(["hi", "0x3535353535353535353535353535353535353535"]),
        );
        assert!(matches!(
            EvmProvider.normalize(&request, &ctx()).unwrap_err(),
            WasmWalletError::InvalidFieldCombination(_)
        ));
    }

    #[test]
    fn test_typed_data_object_param() {
        let typed = json!({
            "types": {"EIP712Domain": [{"name": "name", "type": "string"}]},
            "primaryType": "EIP712Domain",
            "domain": {"name": "x"},
            "message": {}
        });
        let request = DappRequest::new("eth_signTypedData_v4", json!([ACCOUNT, typed]));
        let message = message_of(EvmProvider.normalize(&request, &ctx()).unwrap());
        assert_eq!(message.kind, MessageKind::TypedDataV4);
        assert!(message.message.contains("\"primaryType\""));
    }

    #[test]
    fn test_send_transaction_fills_from_account_state() {
        let request = DappRequest::new(
            "eth_sendTransaction",
            json!([{
                "from": ACCOUNT,
                "to": "0x3535353535353535353535353535353535353535",
                "value": "0xde0b6b3a7640000"
            }]),
        );
        let (tx, broadcast) = evm_of(EvmProvider.normalize(&request, &ctx()).unwrap());
        assert!(broadcast);
        assert_eq!(tx.chain_id, 1);
        assert_eq!(tx.nonce, 9);
        assert_eq!(tx.gas_limit, 21_000);
        assert_eq!(tx.value, U256::from(1_000_000_000_000_000_000u64));
        assert_eq!(
            tx.fee,
            EvmFee::Eip1559 {
                max_fee_per_gas: 30_000_000_000,
                max_priority_fee_per_gas: 1_000_000_000,
                access_list: Vec::new(),
            }
        );
    }

    #[test]
    fn test_explicit_legacy_fee_and_fields() {
        let request = DappRequest::new(
            "eth_signTransaction",
            json!([{
                "to": "0x3535353535353535353535353535353535353535",
                "gas": "0x5208",
                "gasPrice": "20000000000",
                "nonce": 3,
                "chainId": "0x1",
                "data": "0xabcd"
            }]),
        );
        let (tx, broadcast) = evm_of(EvmProvider.normalize(&request, &ctx()).unwrap());
        assert!(!broadcast);
        assert_eq!(tx.nonce, 3);
        assert_eq!(tx.fee, EvmFee::Legacy { gas_price: 20_000_000_000 });
        assert_eq!(tx.data.as_ref(), &[0xab, 0xcd]);
    }

    #[test]
    fn test_transaction_rejections() {
        let mixed = DappRequest::new(
            "eth_sendTransaction",
            json!([{"gasPrice": "1", "maxFeePerGas": "2"}]),
        );
        assert!(matches!(
            EvmProvider.normalize(&mixed, &ctx()).unwrap_err(),
            WasmWalletError::InvalidFieldCombination(_)
        ));

        let wrong_chain = DappRequest::new("eth_sendTransaction", json!([{"chainId": "0x89"}]));
        assert!(matches!(
            EvmProvider.normalize(&wrong_chain, &ctx()).unwrap_err(),
            WasmWalletError::InvalidFieldCombination(_)
        ));

        let wrong_from = DappRequest::new(
            "eth_sendTransaction",
            json!([{"from": "0x3535353535353535353535353535353535353535"}]),
        );
        assert!(EvmProvider.normalize(&wrong_from, &ctx()).is_err());
    }
}
