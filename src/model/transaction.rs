//! The unsigned transaction union
//!
//! One variant per chain family, tagged by `chain`. [`UnsignedTransaction::prepare`]
//! resolves clock and configuration defaults once; afterwards the value is
//! only read.

use crate::chain::ChainFamily;
use crate::chains::cosmos::CosmosTransaction;
use crate::chains::dot::DotTransaction;
use crate::chains::evm::EvmTransaction;
use crate::chains::ton::TonTransfer;
use crate::chains::tron::TronTransaction;
use crate::chains::utxo::UtxoTransaction;
use crate::config::{CoreConfig, DotConfig};
use crate::error::Result;
use crate::model::signing::{Encoder, SignedPayload, SigningPayload};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "chain", rename_all = "lowercase")]
pub enum UnsignedTransaction {
    Btc(UtxoTransaction),
    Evm(EvmTransaction),
    Ton(TonTransfer),
    Tron(TronTransaction),
    Cosmos(CosmosTransaction),
    Dot(DotTransaction),
}

impl UnsignedTransaction {
    /// Deserialize an intent, fill defaults and validate
    pub fn from_json(json: &str, now_ms: u64, config: &CoreConfig) -> Result<Self> {
        let tx: UnsignedTransaction = serde_json::from_str(json)?;
        let tx = tx.prepare(now_ms, config);
        tx.validate()?;
        Ok(tx)
    }

    /// Resolve defaults that depend on the clock or the configuration
    pub fn prepare(self, now_ms: u64, config: &CoreConfig) -> Self {
        match self {
            UnsignedTransaction::Ton(tx) => {
                UnsignedTransaction::Ton(tx.resolve(now_ms / 1000, &config.ton))
            }
            UnsignedTransaction::Tron(tx) => {
                UnsignedTransaction::Tron(tx.resolve(now_ms, &config.tron))
            }
            UnsignedTransaction::Dot(mut tx) => {
                if tx.indices == DotConfig::default() {
                    tx.indices = config.dot;
                }
                UnsignedTransaction::Dot(tx)
            }
            other => other,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            UnsignedTransaction::Btc(tx) => tx.validate(),
            UnsignedTransaction::Evm(tx) => tx.validate(),
            UnsignedTransaction::Ton(tx) => tx.validate(),
            UnsignedTransaction::Tron(tx) => tx.validate(),
            UnsignedTransaction::Cosmos(tx) => tx.validate(),
            UnsignedTransaction::Dot(tx) => tx.validate(),
        }
    }

    fn encoder(&self) -> &dyn Encoder {
        match self {
            UnsignedTransaction::Btc(tx) => tx,
            UnsignedTransaction::Evm(tx) => tx,
            UnsignedTransaction::Ton(tx) => tx,
            UnsignedTransaction::Tron(tx) => tx,
            UnsignedTransaction::Cosmos(tx) => tx,
            UnsignedTransaction::Dot(tx) => tx,
        }
    }
}

impl Encoder for UnsignedTransaction {
    fn chain(&self) -> ChainFamily {
        self.encoder().chain()
    }

    fn build_signing_payload(&self) -> Result<SigningPayload> {
        let payload = self.encoder().build_signing_payload()?;
        tracing::debug!(
            chain = %payload.chain,
            entries = payload.entries.len(),
            "built signing payload"
        );
        Ok(payload)
    }

    fn assemble_signed_payload(&self, signatures: &[Vec<u8>]) -> Result<SignedPayload> {
        self.encoder().assemble_signed_payload(signatures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WasmWalletError;

    const TON_WALLET: &str = "0:ca6e321c7cce9ecedf0a8ca2492ec8592494aa5fb5ce0387dff96ef6af982a3e";

    fn ton_intent(seqno: u32, messages: usize) -> String {
        let message = format!(r#"{{"destination":"{}","amount":"1"}}"#, TON_WALLET);
        let messages = vec![message; messages].join(",");
        format!(
            r#"{{"chain":"ton","walletVersion":"v4r2","address":"{}","seqno":{},"messages":[{}]}}"#,
            TON_WALLET, seqno, messages
        )
    }

    #[test]
    fn test_ton_timeout_resolved_from_clock() {
        let config = CoreConfig::default();
        let tx = UnsignedTransaction::from_json(&ton_intent(1, 1), 1_000_000, &config).unwrap();
        match &tx {
            UnsignedTransaction::Ton(ton) => assert_eq!(ton.timeout, Some(1_060)),
            other => panic!("unexpected variant {:?}", other),
        }
        assert_eq!(tx.chain(), ChainFamily::Ton);
        assert_eq!(
            tx.build_signing_payload().unwrap(),
            tx.build_signing_payload().unwrap()
        );
    }

    #[test]
    fn test_ton_batch_limit_surfaces() {
        let config = CoreConfig::default();
        let err = UnsignedTransaction::from_json(&ton_intent(1, 5), 0, &config).unwrap_err();
        assert_eq!(err, WasmWalletError::BatchLimitExceeded { limit: 4, actual: 5 });
        assert!(UnsignedTransaction::from_json(&ton_intent(1, 4), 0, &config).is_ok());
    }

    #[test]
    fn test_evm_intent() {
        let json = r#"{
            "chain": "evm",
            "chainId": "1",
            "nonce": "9",
            "gasLimit": "21000",
            "to": "0x3535353535353535353535353535353535353535",
            "value": "1000000000000000000",
            "fee": {"type": "legacy", "gasPrice": "20000000000"}
        }"#;
        let tx = UnsignedTransaction::from_json(json, 0, &CoreConfig::default()).unwrap();
        let payload = tx.build_signing_payload().unwrap();
        assert_eq!(payload.chain, ChainFamily::Evm);
        assert_eq!(
            hex::encode(payload.preimage().unwrap()),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
    }

    #[test]
    fn test_unknown_chain_tag() {
        let err =
            UnsignedTransaction::from_json(r#"{"chain":"near"}"#, 0, &CoreConfig::default())
                .unwrap_err();
        assert!(matches!(err, WasmWalletError::Validation(_)));
    }
}
