//! TON Connect bridge methods

use super::{
    field, opt_str_field, str_field, Capability, DappRequest, NormalizedRequest, ProviderApi,
    RequestContext,
};
use crate::chain::ChainFamily;
use crate::chains::ton::boc::parse_boc_base64;
use crate::chains::ton::{MessageBody, TonAddress, TonMessage, TonTransfer};
use crate::config::TonConfig;
use crate::error::{Result, WasmWalletError};
use crate::model::message::{
    MessageKind, MessagePayload, TonMessagePayload, TonSignDataPayload, UnsignedMessage,
};
use crate::model::transaction::UnsignedTransaction;
use crate::primitives::amount::parse_uint;
use serde_json::Value;

const TESTNET_NETWORK_ID: &str = "-3";
/// TON Connect caps `sendTransaction` at four messages for every wallet
const MAX_DAPP_MESSAGES: usize = 4;

pub struct TonProvider {
    config: TonConfig,
}

impl TonProvider {
    pub fn new(config: TonConfig) -> Self {
        TonProvider { config }
    }

    fn check_valid_until(&self, tx: &Value, ctx: &RequestContext) -> Result<Option<u64>> {
        let Some(value) = field(tx, "validUntil").or_else(|| field(tx, "valid_until")) else {
            return Ok(None);
        };
        let valid_until = value
            .as_f64()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| WasmWalletError::from("Incorrect validUntil"))?;
        if valid_until < ctx.now_secs() as f64 {
            return Err("Transaction has expired".into());
        }
        Ok(Some(valid_until as u64))
    }

    fn check_network(&self, tx: &Value) -> Result<()> {
        match field(tx, "network") {
            None => Ok(()),
            Some(Value::String(network)) if *network == self.config.mainnet_network_id => Ok(()),
            Some(Value::String(network)) if network == TESTNET_NETWORK_ID => {
                Err(WasmWalletError::unsupported("Testnet not supported"))
            }
            Some(Value::String(_)) => Err("Wrong network".into()),
            Some(_) => Err("Wrong network format".into()),
        }
    }

    fn message(value: &Value) -> Result<TonMessage> {
        let address = str_field(value, "address")?;
        if TonAddress::parse_raw(address).is_ok() {
            return Err("Wrong address format".into());
        }
        TonAddress::parse_friendly(address).map_err(|_| WasmWalletError::from("Invalid address"))?;

        let amount = match field(value, "amount") {
            Some(Value::String(amount)) => parse_uint(amount)
                .map_err(|_| WasmWalletError::from("Wrong amount format"))?,
            Some(_) => return Err("Wrong amount format".into()),
            None => return Err("Amount is required".into()),
        };
        let body = match opt_str_field(value, "payload")? {
            Some(boc) => {
                parse_boc_base64(boc).map_err(|_| WasmWalletError::from("Payload is invalid"))?;
                MessageBody::Raw {
                    boc: boc.to_string(),
                }
            }
            None => MessageBody::Empty,
        };
        let state_init = opt_str_field(value, "stateInit")?
            .map(|init| {
                parse_boc_base64(init)
                    .map(|_| init.to_string())
                    .map_err(|_| WasmWalletError::from("stateInit is invalid"))
            })
            .transpose()?;

        Ok(TonMessage {
            destination: address.to_string(),
            amount,
            bounce: None,
            body,
            send_mode: None,
            state_init,
        })
    }

    fn check_from(tx: &Value, ctx: &RequestContext) -> Result<()> {
        let Some(from) = opt_str_field(tx, "from")? else {
            return Ok(());
        };
        let (from, _) =
            TonAddress::parse(from).map_err(|_| WasmWalletError::from("Wrong from address format"))?;
        let (account, _) = TonAddress::parse(&ctx.address)?;
        if from != account {
            return Err(WasmWalletError::InvalidFieldCombination(
                "Wrong from address".to_string(),
            ));
        }
        Ok(())
    }

    fn sign_data(&self, request: &DappRequest, ctx: &RequestContext) -> Result<UnsignedMessage> {
        let params = request.param(0)?;
        let base = TonMessagePayload {
            is_proof: false,
            schema_crc: None,
            timestamp: Some(ctx.now_secs()),
            app_domain: ctx.app_domain().to_string(),
            address: ctx.address.clone(),
            payload: None,
        };

        if field(params, "type").is_none() {
            let schema_crc = field(params, "schema_crc")
                .and_then(Value::as_u64)
                .and_then(|crc| u32::try_from(crc).ok())
                .ok_or_else(|| WasmWalletError::from("schema_crc must be a uint32"))?;
            let cell = str_field(params, "cell")?;
            parse_boc_base64(cell)?;
            let payload = TonMessagePayload {
                schema_crc: Some(schema_crc),
                payload: Some(TonSignDataPayload::Cell {
                    schema: String::new(),
                    cell: cell.to_string(),
                }),
                ..base
            };
            return UnsignedMessage::new(
                MessageKind::TonSignData,
                cell,
                MessagePayload::Ton(payload),
            );
        }

        let data: TonSignDataPayload = serde_json::from_value(params.clone())?;
        let message = match &data {
            TonSignDataPayload::Text { text } => text.clone(),
            TonSignDataPayload::Binary { bytes } => bytes.clone(),
            TonSignDataPayload::Cell { cell, .. } => {
                parse_boc_base64(cell)?;
                cell.clone()
            }
        };
        UnsignedMessage::new(
            MessageKind::TonSignDataV1,
            message,
            MessagePayload::Ton(TonMessagePayload {
                payload: Some(data),
                ..base
            }),
        )
    }
}

impl ProviderApi for TonProvider {
    fn chain(&self) -> ChainFamily {
        ChainFamily::Ton
    }

    fn capability(&self, method: &str) -> Option<Capability> {
        match method {
            "connect" | "restoreConnection" => Some(Capability::RequestAccounts),
            "signData" | "signProof" => Some(Capability::SignMessage),
            "sendTransaction" => Some(Capability::SendTransaction),
            _ => None,
        }
    }

    fn request_accounts(&self, request: &DappRequest, ctx: &RequestContext) -> Result<NormalizedRequest> {
        if request.method == "connect" {
            // [protocolVersion, { manifestUrl, items }]
            let connect = request.param(1).or_else(|_| request.param(0))?;
            match opt_str_field(connect, "manifestUrl")? {
                Some(url) if !url.is_empty() => {}
                _ => return Err("App manifest not found".into()),
            }
        }
        TonAddress::parse(&ctx.address)?;
        Ok(NormalizedRequest::Accounts {
            chain: ChainFamily::Ton,
            accounts: vec![ctx.address.clone()],
            public_key: ctx.public_key.clone(),
        })
    }

    fn sign_message(&self, request: &DappRequest, ctx: &RequestContext) -> Result<NormalizedRequest> {
        let message = if request.method == "signProof" {
            let params = request.param(0)?;
            let payload = match field(params, "payload") {
                Some(Value::String(payload)) => payload.clone(),
                _ => String::new(),
            };
            UnsignedMessage::new(
                MessageKind::TonSignProof,
                payload,
                MessagePayload::Ton(TonMessagePayload {
                    is_proof: true,
                    schema_crc: None,
                    timestamp: Some(ctx.now_secs()),
                    app_domain: ctx.app_domain().to_string(),
                    address: ctx.address.clone(),
                    payload: None,
                }),
            )?
        } else {
            self.sign_data(request, ctx)?
        };
        Ok(NormalizedRequest::SignMessage { message })
    }

    fn send_transaction(&self, request: &DappRequest, ctx: &RequestContext) -> Result<NormalizedRequest> {
        let tx = request.param(0)?;
        let timeout = self.check_valid_until(tx, ctx)?;
        self.check_network(tx)?;

        let messages = match field(tx, "messages") {
            Some(Value::Array(messages)) if !messages.is_empty() => messages,
            _ => return Err("Empty messages".into()),
        };
        if messages.len() > MAX_DAPP_MESSAGES {
            return Err(WasmWalletError::BatchLimitExceeded {
                limit: MAX_DAPP_MESSAGES,
                actual: messages.len(),
            });
        }
        let messages = messages
            .iter()
            .map(Self::message)
            .collect::<Result<Vec<_>>>()?;
        Self::check_from(tx, ctx)?;

        let wallet = ctx
            .account
            .ton_wallet
            .as_ref()
            .ok_or_else(|| WasmWalletError::from("TON wallet version is unknown"))?;
        let seqno = ctx
            .account
            .nonce
            .ok_or_else(|| WasmWalletError::from("TON wallet seqno is unknown"))?;
        let seqno = u32::try_from(seqno)
            .map_err(|_| WasmWalletError::Validation(format!("seqno {} exceeds uint32", seqno)))?;

        let transfer = TonTransfer {
            wallet_version: wallet.version,
            address: ctx.address.clone(),
            wallet_id: wallet.wallet_id,
            seqno,
            messages,
            send_mode: None,
            timeout,
            state_init: if seqno == 0 { wallet.state_init.clone() } else { None },
        }
        .resolve(ctx.now_secs(), &self.config);
        let transaction = UnsignedTransaction::Ton(transfer);
        transaction.validate()?;
        Ok(NormalizedRequest::SignTransaction {
            transaction,
            broadcast: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::ton::WalletVersion;
    use crate::dapp::tests::context;
    use crate::dapp::TonWalletState;
    use serde_json::json;

    const WALLET: &str = "UQDKbjIcfM6ezt8KjKJJLshZJJSqX7XOA4ff-W72r5gqPuwA";
    const DESTINATION: &str = "EQDKbjIcfM6ezt8KjKJJLshZJJSqX7XOA4ff-W72r5gqPrHF";
    const PAYLOAD_BOC: &str = "te6cckEBAQEABgAACN6tvu+qPBS2";

    fn provider() -> TonProvider {
        TonProvider::new(TonConfig::default())
    }

    fn ctx() -> RequestContext {
        let mut ctx = context(WALLET);
        ctx.account.nonce = Some(5);
        ctx.account.ton_wallet = Some(TonWalletState {
            version: WalletVersion::V4R2,
            wallet_id: None,
            state_init: None,
        });
        ctx
    }

    fn send(tx: Value) -> Result<NormalizedRequest> {
        provider().normalize(&DappRequest::new("sendTransaction", json!([tx])), &ctx())
    }

    fn message(amount: Value) -> Value {
        json!({"address": DESTINATION, "amount": amount})
    }

    #[test]
    fn test_send_transaction() {
        let result = send(json!({
            "validUntil": 1_700_000_300,
            "network": "-239",
            "from": WALLET,
            "messages": [{"address": DESTINATION, "amount": "1000000000", "payload": PAYLOAD_BOC}]
        }))
        .unwrap();
        let NormalizedRequest::SignTransaction {
            transaction: UnsignedTransaction::Ton(transfer),
            broadcast,
        } = result
        else {
            panic!("expected a TON transfer");
        };
        assert!(broadcast);
        assert_eq!(transfer.seqno, 5);
        assert_eq!(transfer.timeout, Some(1_700_000_300));
        assert_eq!(transfer.messages[0].amount, 1_000_000_000);
        assert_eq!(
            transfer.messages[0].body,
            MessageBody::Raw {
                boc: PAYLOAD_BOC.to_string()
            }
        );
    }

    #[test]
    fn test_default_timeout_from_context_clock() {
        let result = send(json!({"messages": [message(json!("1"))]})).unwrap();
        let NormalizedRequest::SignTransaction {
            transaction: UnsignedTransaction::Ton(transfer),
            ..
        } = result
        else {
            panic!("expected a TON transfer");
        };
        assert_eq!(transfer.timeout, Some(1_700_000_060));
    }

    #[test]
    fn test_valid_until_checks() {
        let expired = send(json!({"validUntil": 1_600_000_000, "messages": [message(json!("1"))]}));
        assert_eq!(
            expired.unwrap_err().to_string(),
            "Validation error: Transaction has expired"
        );
        let text = send(json!({"validUntil": "soon", "messages": [message(json!("1"))]}));
        assert_eq!(text.unwrap_err().to_string(), "Validation error: Incorrect validUntil");
    }

    #[test]
    fn test_network_checks() {
        let testnet = send(json!({"network": "-3", "messages": [message(json!("1"))]})).unwrap_err();
        assert!(matches!(testnet, WasmWalletError::UnsupportedChainVariant(_)));
        let other = send(json!({"network": "1", "messages": [message(json!("1"))]})).unwrap_err();
        assert_eq!(other.to_string(), "Validation error: Wrong network");
        let number = send(json!({"network": -239, "messages": [message(json!("1"))]})).unwrap_err();
        assert_eq!(number.to_string(), "Validation error: Wrong network format");
    }

    #[test]
    fn test_message_checks() {
        assert_eq!(
            send(json!({"messages": []})).unwrap_err().to_string(),
            "Validation error: Empty messages"
        );
        let five: Vec<Value> = (0..5).map(|_| message(json!("1"))).collect();
        assert_eq!(
            send(json!({ "messages": five })).unwrap_err(),
            WasmWalletError::BatchLimitExceeded { limit: 4, actual: 5 }
        );
        assert_eq!(
            send(json!({"messages": [message(json!(1))]})).unwrap_err().to_string(),
            "Validation error: Wrong amount format"
        );
        let raw = json!({"address": "0:ca6e321c7cce9ecedf0a8ca2492ec8592494aa5fb5ce0387dff96ef6af982a3e", "amount": "1"});
        assert_eq!(
            send(json!({ "messages": [raw] })).unwrap_err().to_string(),
            "Validation error: Wrong address format"
        );
        let bad_payload = json!({"address": DESTINATION, "amount": "1", "payload": "bm90IGEgYm9j"});
        assert_eq!(
            send(json!({ "messages": [bad_payload] })).unwrap_err().to_string(),
            "Validation error: Payload is invalid"
        );
    }

    #[test]
    fn test_sign_data_shapes() {
        let text = provider()
            .normalize(
                &DappRequest::new("signData", json!([{"type": "text", "text": "hello"}])),
                &ctx(),
            )
            .unwrap();
        let NormalizedRequest::SignMessage { message } = text else {
            panic!("expected a message");
        };
        assert_eq!(message.kind, MessageKind::TonSignDataV1);
        match message.payload {
            MessagePayload::Ton(ton) => {
                assert_eq!(ton.app_domain, "app.example.com");
                assert_eq!(ton.timestamp, Some(1_700_000_000));
            }
            other => panic!("unexpected payload {:?}", other),
        }

        let legacy = provider()
            .normalize(
                &DappRequest::new("signData", json!([{"schema_crc": 7, "cell": PAYLOAD_BOC}])),
                &ctx(),
            )
            .unwrap();
        let NormalizedRequest::SignMessage { message } = legacy else {
            panic!("expected a message");
        };
        assert_eq!(message.kind, MessageKind::TonSignData);
    }

    #[test]
    fn test_sign_proof_and_connect() {
        let proof = provider()
            .normalize(&DappRequest::new("signProof", json!([{"payload": "nonce"}])), &ctx())
            .unwrap();
        let NormalizedRequest::SignMessage { message } = proof else {
            panic!("expected a message");
        };
        assert_eq!(message.kind, MessageKind::TonSignProof);
        assert_eq!(message.message, "nonce");

        let connect = DappRequest::new("connect", json!([2, {"manifestUrl": "https://app.example.com/m.json"}]));
        assert!(provider().normalize(&connect, &ctx()).is_ok());
        let no_manifest = DappRequest::new("connect", json!([2, {}]));
        assert!(provider().normalize(&no_manifest, &ctx()).is_err());
    }
}
