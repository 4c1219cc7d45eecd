//! Keplr-style Cosmos provider methods

use super::{
    field, opt_str_field, quantity, str_field, to_u64, Capability, DappRequest,
    NormalizedRequest, ProviderApi, RequestContext,
};
use crate::chain::ChainFamily;
use crate::chains::cosmos::{CosmosTransaction, StdSignDoc};
use crate::error::{Result, WasmWalletError};
use crate::model::message::{CosmosMessagePayload, MessageKind, MessagePayload, UnsignedMessage};
use crate::model::transaction::UnsignedTransaction;
use crate::primitives::bytes::decode_hex_or_base64;
use serde_json::Value;

pub struct CosmosProvider;

/// `signer` or, for the WalletConnect names, `signerAddress`
fn signer<'a>(params: &'a Value, ctx: &RequestContext) -> Result<&'a str> {
    let signer = match opt_str_field(params, "signer")? {
        Some(signer) => signer,
        None => str_field(params, "signerAddress")?,
    };
    if signer != ctx.address {
        return Err(WasmWalletError::InvalidFieldCombination(format!(
            "signer {} is not the connected account",
            signer
        )));
    }
    Ok(signer)
}

fn check_chain_id(params: &Value, doc_chain_id: &str) -> Result<()> {
    match opt_str_field(params, "chainId")? {
        Some(chain_id) if chain_id != doc_chain_id => {
            Err(WasmWalletError::InvalidFieldCombination(format!(
                "chainId {} does not match the sign doc's {}",
                chain_id, doc_chain_id
            )))
        }
        _ => Ok(()),
    }
}

impl CosmosProvider {
    fn amino(params: &Value, ctx: &RequestContext) -> Result<CosmosTransaction> {
        let sign_doc: StdSignDoc = serde_json::from_value(
            field(params, "signDoc")
                .ok_or_else(|| WasmWalletError::from("signDoc is required"))?
                .clone(),
        )?;
        check_chain_id(params, &sign_doc.chain_id)?;
        let public_key = ctx
            .public_key
            .as_deref()
            .ok_or_else(|| WasmWalletError::from("amino signing needs the account public key"))?;
        Ok(CosmosTransaction::Amino {
            sign_doc,
            public_key: decode_hex_or_base64(public_key)?,
        })
    }

    fn direct(params: &Value) -> Result<CosmosTransaction> {
        let doc = field(params, "signDoc")
            .ok_or_else(|| WasmWalletError::from("signDoc is required"))?;
        let chain_id = str_field(doc, "chainId")?;
        check_chain_id(params, chain_id)?;
        let account_number = field(doc, "accountNumber")
            .ok_or_else(|| WasmWalletError::from("accountNumber is required"))?;
        Ok(CosmosTransaction::Direct {
            body_bytes: decode_hex_or_base64(str_field(doc, "bodyBytes")?)?,
            auth_info_bytes: decode_hex_or_base64(str_field(doc, "authInfoBytes")?)?,
            chain_id: chain_id.to_string(),
            account_number: to_u64(quantity(account_number, "accountNumber")?, "accountNumber")?,
        })
    }
}

impl ProviderApi for CosmosProvider {
    fn chain(&self) -> ChainFamily {
        ChainFamily::Cosmos
    }

    fn capability(&self, method: &str) -> Option<Capability> {
        match method {
            "enable" | "getKey" | "cosmos_getAccounts" => Some(Capability::RequestAccounts),
            "signAmino" | "signDirect" | "cosmos_signAmino" | "cosmos_signDirect" => {
                Some(Capability::SignTransaction)
            }
            "signArbitrary" => Some(Capability::SignMessage),
            "sendTx" => Some(Capability::SendTransaction),
            _ => None,
        }
    }

    fn sign_message(&self, request: &DappRequest, ctx: &RequestContext) -> Result<NormalizedRequest> {
        let params = request.param(0)?;
        let signer = signer(params, ctx)?.to_string();
        let data = match field(params, "data") {
            Some(Value::String(data)) => data.clone(),
            _ => return Err("signArbitrary data must be a string".into()),
        };
        let message = UnsignedMessage::new(
            MessageKind::CosmosAdr36,
            data,
            MessagePayload::Cosmos(CosmosMessagePayload {
                signer,
                chain_id: opt_str_field(params, "chainId")?.map(str::to_string),
            }),
        )?;
        Ok(NormalizedRequest::SignMessage { message })
    }

    fn sign_transaction(&self, request: &DappRequest, ctx: &RequestContext) -> Result<NormalizedRequest> {
        let params = request.param(0)?;
        signer(params, ctx)?;
        let tx = if request.method.ends_with("signAmino") {
            Self::amino(params, ctx)?
        } else {
            Self::direct(params)?
        };
        let transaction = UnsignedTransaction::Cosmos(tx);
        transaction.validate()?;
        Ok(NormalizedRequest::SignTransaction {
            transaction,
            broadcast: false,
        })
    }

    fn send_transaction(&self, request: &DappRequest, _ctx: &RequestContext) -> Result<NormalizedRequest> {
        Err(WasmWalletError::unsupported(format!(
            "{} needs a broadcast endpoint; sign and broadcast separately",
            request.method
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dapp::tests::context;
    use serde_json::json;

    const SIGNER: &str = "cosmos1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5lzv7xu";

    fn ctx() -> RequestContext {
        let mut ctx = context(SIGNER);
        ctx.public_key =
            Some("02a1633cafcc01ebfb6d78e39f687a1f0995c62fc95f51ead10a02ee0be551b5dc".to_string());
        ctx
    }

    fn cosmos_of(result: NormalizedRequest) -> CosmosTransaction {
        match result {
            NormalizedRequest::SignTransaction {
                transaction: UnsignedTransaction::Cosmos(tx),
                ..
            } => tx,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_sign_direct_accepts_hex_and_base64() {
        let request = DappRequest::new(
            "signDirect",
            json!([{
                "chainId": "cosmoshub-4",
                "signer": SIGNER,
                "signDoc": {
                    "bodyBytes": "0x0a03616263",
                    "authInfoBytes": "EgNkZWY=",
                    "chainId": "cosmoshub-4",
                    "accountNumber": "12"
                }
            }]),
        );
        let tx = cosmos_of(CosmosProvider.normalize(&request, &ctx()).unwrap());
        assert_eq!(
            tx,
            CosmosTransaction::Direct {
                body_bytes: vec![0x0a, 0x03, 0x61, 0x62, 0x63],
                auth_info_bytes: vec![0x12, 0x03, 0x64, 0x65, 0x66],
                chain_id: "cosmoshub-4".to_string(),
                account_number: 12,
            }
        );
    }

    #[test]
    fn test_sign_amino_uses_context_key() {
        let request = DappRequest::new(
            "cosmos_signAmino",
            json!([{
                "signerAddress": SIGNER,
                "signDoc": {
                    "chain_id": "cosmoshub-4",
                    "account_number": "12",
                    "sequence": "3",
                    "fee": {"amount": [{"denom": "uatom", "amount": "500"}], "gas": "200000"},
                    "msgs": [],
                    "memo": ""
                }
            }]),
        );
        match cosmos_of(CosmosProvider.normalize(&request, &ctx()).unwrap()) {
            CosmosTransaction::Amino { public_key, .. } => assert_eq!(public_key.len(), 33),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_signer_and_chain_checks() {
        let other_signer = DappRequest::new(
            "signArbitrary",
            json!([{"signer": "cosmos1other", "data": "hi"}]),
        );
        assert!(matches!(
            CosmosProvider.normalize(&other_signer, &ctx()).unwrap_err(),
            WasmWalletError::InvalidFieldCombination(_)
        ));

        let mismatched = DappRequest::new(
            "signDirect",
            json!([{
                "chainId": "osmosis-1",
                "signer": SIGNER,
                "signDoc": {"bodyBytes": "0a", "authInfoBytes": "", "chainId": "cosmoshub-4", "accountNumber": 1}
            }]),
        );
        assert!(matches!(
            CosmosProvider.normalize(&mismatched, &ctx()).unwrap_err(),
            WasmWalletError::InvalidFieldCombination(_)
        ));
    }

    #[test]
    fn test_sign_arbitrary_and_send() {
        let request = DappRequest::new("signArbitrary", json!([{"signer": SIGNER, "data": "hello"}]));
        let NormalizedRequest::SignMessage { message } = CosmosProvider.normalize(&request, &ctx()).unwrap()
        else {
            panic!("expected a message");
        };
        assert_eq!(message.kind, MessageKind::CosmosAdr36);

        let send = DappRequest::new("sendTx", json!([]));
        assert!(matches!(
            CosmosProvider.normalize(&send, &ctx()).unwrap_err(),
            WasmWalletError::UnsupportedChainVariant(_)
        ));
    }
}
