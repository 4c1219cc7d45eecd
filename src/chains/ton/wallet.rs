//! Wallet contract transfers
//!
//! A transfer is signed over the wallet's signing cell and broadcast as an
//! external message to the wallet itself.

use super::address::TonAddress;
use super::boc::{parse_boc_base64, to_boc};
use super::cell::{Cell, CellBuilder};
use super::message::{external_message, TonMessage};
use crate::chain::ChainFamily;
use crate::config::TonConfig;
use crate::error::{Result, WasmWalletError};
use crate::model::signing::{
    expect_signature_len, expect_signatures, DigestAlgorithm, Encoder, SignatureScheme,
    SignedPayload, SigningPayload,
};
use crate::primitives::amount::opt_u64_str;
use serde::{Deserialize, Serialize};

/// Subwallet id base shared by the v3 and v4 contracts
const DEFAULT_SUBWALLET_ID: i64 = 698_983_191;
const MAINNET_GLOBAL_ID: i32 = -239;
const V5_AUTH_SIGNED_EXTERNAL: u32 = 0x7369_676e;
const ACTION_SEND_MSG: u32 = 0x0ec3_c86d;
/// PAY_GAS_SEPARATELY | IGNORE_ERRORS
pub const DEFAULT_SEND_MODE: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletVersion {
    V3R2,
    V4R2,
    V5R1,
}

impl WalletVersion {
    pub fn max_messages(&self) -> usize {
        match self {
            WalletVersion::V3R2 | WalletVersion::V4R2 => 4,
            WalletVersion::V5R1 => 255,
        }
    }

    pub fn default_wallet_id(&self, workchain: i32) -> u32 {
        match self {
            WalletVersion::V3R2 | WalletVersion::V4R2 => {
                (DEFAULT_SUBWALLET_ID + workchain as i64) as u32
            }
            // client context: bit 31 set, workchain in bits 23..31, version 0, subwallet 0
            WalletVersion::V5R1 => {
                let context = (1u32 << 31) | (((workchain as u32) & 0xff) << 23);
                (MAINNET_GLOBAL_ID as u32) ^ context
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TonTransfer {
    pub wallet_version: WalletVersion,
    /// The sending wallet
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<u32>,
    pub seqno: u32,
    pub messages: Vec<TonMessage>,
    /// Applies to messages without their own send mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_mode: Option<u8>,
    /// Absolute `validUntil`, unix seconds. Ignored when seqno is 0.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_u64_str")]
    pub timeout: Option<u64>,
    /// base64 BoC of the wallet's StateInit, attached while seqno is 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_init: Option<String>,
}

impl TonTransfer {
    /// Fill the clock-dependent and configurable defaults. After this the
    /// transfer encodes without consulting the clock.
    pub fn resolve(mut self, now: u64, config: &TonConfig) -> Self {
        if self.seqno != 0 && self.timeout.is_none() {
            self.timeout = now.checked_add(config.default_timeout_secs);
        }
        if self.send_mode.is_none() {
            self.send_mode = Some(config.default_send_mode);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.messages.is_empty() {
            return Err("TON transfer has no messages".into());
        }
        let limit = self.wallet_version.max_messages();
        if self.messages.len() > limit {
            return Err(WasmWalletError::BatchLimitExceeded {
                limit,
                actual: self.messages.len(),
            });
        }
        if self.seqno != 0 && self.timeout.is_none() {
            return Err("TON transfer timeout is unresolved".into());
        }
        self.wallet()?;
        Ok(())
    }

    fn wallet(&self) -> Result<TonAddress> {
        self.address.parse()
    }

    fn wallet_id(&self, wallet: &TonAddress) -> u32 {
        self.wallet_id
            .unwrap_or_else(|| self.wallet_version.default_wallet_id(wallet.workchain))
    }

    fn valid_until(&self) -> Result<u32> {
        if self.seqno == 0 {
            return Ok(u32::MAX);
        }
        let timeout = self
            .timeout
            .ok_or_else(|| WasmWalletError::from("TON transfer timeout is unresolved"))?;
        u32::try_from(timeout)
            .map_err(|_| WasmWalletError::Validation(format!("timeout {} exceeds uint32", timeout)))
    }

    fn send_mode(&self, message: &TonMessage) -> u8 {
        message
            .send_mode
            .or(self.send_mode)
            .unwrap_or(DEFAULT_SEND_MODE)
    }

    /// Signing message as a builder, since v5 appends the signature to it
    fn signing_builder(&self) -> Result<CellBuilder> {
        self.validate()?;
        let wallet = self.wallet()?;
        let wallet_id = self.wallet_id(&wallet) as u128;
        let valid_until = self.valid_until()? as u128;
        let seqno = self.seqno as u128;

        let mut b = CellBuilder::new();
        match self.wallet_version {
            WalletVersion::V3R2 | WalletVersion::V4R2 => {
                b.store_uint(wallet_id, 32)?
                    .store_uint(valid_until, 32)?
                    .store_uint(seqno, 32)?;
                if self.wallet_version == WalletVersion::V4R2 {
                    // simple send
                    b.store_uint(0, 8)?;
                }
                for message in &self.messages {
                    b.store_uint(self.send_mode(message) as u128, 8)?
                        .store_ref(message.to_internal_cell(&wallet)?)?;
                }
            }
            WalletVersion::V5R1 => {
                let out_list = self.v5_out_list(&wallet)?;
                b.store_uint(V5_AUTH_SIGNED_EXTERNAL as u128, 32)?
                    .store_uint(wallet_id, 32)?
                    .store_uint(valid_until, 32)?
                    .store_uint(seqno, 32)?
                    .store_maybe_ref(Some(out_list))?
                    // no extended actions
                    .store_bit(false)?;
            }
        }
        Ok(b)
    }

    /// `OutList`: each action cell references the previous one, first action outermost
    fn v5_out_list(&self, wallet: &TonAddress) -> Result<Cell> {
        let mut list = Cell::empty();
        for message in self.messages.iter().rev() {
            let mut b = CellBuilder::new();
            b.store_ref(list)?
                .store_uint(ACTION_SEND_MSG as u128, 32)?
                .store_uint(self.send_mode(message) as u128, 8)?
                .store_ref(message.to_internal_cell(wallet)?)?;
            list = b.build()?;
        }
        Ok(list)
    }

    pub fn signing_cell(&self) -> Result<Cell> {
        self.signing_builder()?.build()
    }

    fn signed_body(&self, signature: &[u8]) -> Result<Cell> {
        let signing = self.signing_builder()?;
        let mut b = CellBuilder::new();
        match self.wallet_version {
            WalletVersion::V3R2 | WalletVersion::V4R2 => {
                b.store_bytes(signature)?.store_builder(&signing)?;
            }
            WalletVersion::V5R1 => {
                b.store_builder(&signing)?.store_bytes(signature)?;
            }
        }
        b.build()
    }

    fn preview(&self) -> String {
        self.messages
            .iter()
            .map(TonMessage::preview)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl Encoder for TonTransfer {
    fn chain(&self) -> ChainFamily {
        ChainFamily::Ton
    }

    fn build_signing_payload(&self) -> Result<SigningPayload> {
        let cell = self.signing_cell()?;
        tracing::debug!(
            version = ?self.wallet_version,
            messages = self.messages.len(),
            "built TON signing cell"
        );
        Ok(SigningPayload::single(
            ChainFamily::Ton,
            cell.hash().to_vec(),
            DigestAlgorithm::None,
            SignatureScheme::Ed25519,
        )
        .with_signing_message(to_boc(&cell)?)
        .with_preview(self.preview()))
    }

    fn assemble_signed_payload(&self, signatures: &[Vec<u8>]) -> Result<SignedPayload> {
        expect_signatures(signatures, 1)?;
        expect_signature_len(&signatures[0], &[64])?;

        let wallet = self.wallet()?;
        let body = self.signed_body(&signatures[0])?;
        let init = match (&self.state_init, self.seqno) {
            (Some(init), 0) => Some(parse_boc_base64(init)?),
            _ => None,
        };
        let ext = external_message(&wallet, init.as_ref(), &body)?;
        Ok(SignedPayload {
            chain: ChainFamily::Ton,
            raw: to_boc(&ext)?,
            txid: hex::encode(ext.hash()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::ton::boc::{parse_boc, to_boc_base64};
    use crate::chains::ton::message::MessageBody;
    use rstest::rstest;

    const WALLET: &str = "0:ca6e321c7cce9ecedf0a8ca2492ec8592494aa5fb5ce0387dff96ef6af982a3e";
    const TIMEOUT: u64 = 1_700_000_060;

    fn hello() -> TonMessage {
        TonMessage {
            destination: "UQDKbjIcfM6ezt8KjKJJLshZJJSqX7XOA4ff-W72r5gqPuwA".to_string(),
            amount: 1_000_000_000,
            bounce: None,
            body: MessageBody::Comment {
                text: "hello".to_string(),
            },
            send_mode: None,
            state_init: None,
        }
    }

    fn transfer(version: WalletVersion, seqno: u32, count: usize) -> TonTransfer {
        TonTransfer {
            wallet_version: version,
            address: WALLET.to_string(),
            wallet_id: None,
            seqno,
            messages: vec![hello(); count],
            send_mode: None,
            timeout: Some(TIMEOUT),
            state_init: None,
        }
    }

    fn signature() -> Vec<u8> {
        (0u8..64).collect()
    }

    #[rstest]
    #[case(
        WalletVersion::V4R2,
        "6b69c8099cde1362924d5fe0d833e07db4a4e2af91ef4eb039f26a51aa06cef6",
        "15041e1e467b4e0f08bc5565634f06ea566fafc938d7bb99af733433043c6b43"
    )]
    #[case(
        WalletVersion::V5R1,
        "ee68cd76ea7944168a91b3790917317812c3900f2ce45db838fa0ee9a653ee35",
        "29fbe29e587276cd7db3ce537af9a6d67622569065bd7265281024aa131b4c88"
    )]
    fn test_golden_transfer(#[case] version: WalletVersion, #[case] hash: &str, #[case] txid: &str) {
        let tx = transfer(version, 1, 1);
        let payload = tx.build_signing_payload().unwrap();
        assert_eq!(payload.entries.len(), 1);
        assert_eq!(hex::encode(payload.preimage().unwrap()), hash);
        assert_eq!(payload.entries[0].digest, DigestAlgorithm::None);
        assert_eq!(payload.entries[0].scheme, SignatureScheme::Ed25519);

        let signing = parse_boc(payload.signing_message.as_deref().unwrap()).unwrap();
        assert_eq!(hex::encode(signing.hash()), hash);

        let signed = tx.assemble_signed_payload(&[signature()]).unwrap();
        assert_eq!(signed.txid, txid);
        assert_eq!(hex::encode(parse_boc(&signed.raw).unwrap().hash()), txid);
    }

    #[test]
    fn test_seqno_zero_deploys_with_state_init() {
        let mut init = CellBuilder::new();
        init.store_uint(0b00110, 5).unwrap();
        let mut code = CellBuilder::new();
        code.store_uint(0xdead, 16).unwrap();
        init.store_ref(code.build().unwrap()).unwrap();

        let mut tx = transfer(WalletVersion::V3R2, 0, 1);
        tx.timeout = None;
        tx.state_init = Some(to_boc_base64(&init.build().unwrap()).unwrap());

        let payload = tx.build_signing_payload().unwrap();
        assert_eq!(
            hex::encode(payload.preimage().unwrap()),
            "63f014db18788fe67bcc3a01dfd149bbdeb1a938ed860a8707c35b33a7ac9b83"
        );
        let signed = tx.assemble_signed_payload(&[signature()]).unwrap();
        assert_eq!(
            signed.txid,
            "582fbd61a8d36002f4a16c39ee8e661f762ecf17e15b5b67bd373ef49e8ddfaf"
        );
    }

    fn valid_until_field(tx: &TonTransfer) -> u128 {
        let cell = tx.signing_cell().unwrap();
        let mut slice = cell.parse();
        slice.load_uint(32).unwrap();
        slice.load_uint(32).unwrap()
    }

    #[test]
    fn test_valid_until_by_seqno() {
        let config = TonConfig::default();

        let deploy = transfer(WalletVersion::V4R2, 0, 1).resolve(1_000, &config);
        assert_eq!(valid_until_field(&deploy), u32::MAX as u128);

        let mut next = transfer(WalletVersion::V4R2, 1, 1);
        next.timeout = None;
        let next = next.resolve(1_000, &config);
        assert_eq!(next.timeout, Some(1_060));
        assert_eq!(next.send_mode, Some(3));
        assert_eq!(valid_until_field(&next), 1_060);
    }

    #[test]
    fn test_unresolved_timeout_rejected() {
        let mut tx = transfer(WalletVersion::V4R2, 5, 1);
        tx.timeout = None;
        assert!(tx.build_signing_payload().is_err());

        let mut tx = transfer(WalletVersion::V4R2, 5, 1);
        tx.timeout = None;
        let tx = tx.resolve(u64::MAX, &TonConfig::default());
        assert_eq!(tx.timeout, None);
        assert!(tx.validate().is_err());
    }

    #[rstest]
    #[case(WalletVersion::V3R2)]
    #[case(WalletVersion::V4R2)]
    fn test_batch_limit(#[case] version: WalletVersion) {
        assert!(transfer(version, 1, 4).build_signing_payload().is_ok());
        let err = transfer(version, 1, 5).build_signing_payload().unwrap_err();
        assert_eq!(err, WasmWalletError::BatchLimitExceeded { limit: 4, actual: 5 });
    }

    #[test]
    fn test_v5_accepts_larger_batches() {
        let tx = transfer(WalletVersion::V5R1, 1, 5);
        assert!(tx.build_signing_payload().is_ok());
    }

    #[test]
    fn test_default_wallet_ids() {
        assert_eq!(WalletVersion::V4R2.default_wallet_id(0), 698_983_191);
        assert_eq!(WalletVersion::V3R2.default_wallet_id(-1), 698_983_190);
        assert_eq!(WalletVersion::V5R1.default_wallet_id(0), 2_147_483_409);
    }

    #[test]
    fn test_deterministic_and_rejects_bad_signature() {
        let tx = transfer(WalletVersion::V4R2, 3, 2);
        assert_eq!(tx.build_signing_payload().unwrap(), tx.build_signing_payload().unwrap());
        assert!(tx.assemble_signed_payload(&[vec![0u8; 65]]).is_err());
        assert!(tx.assemble_signed_payload(&[]).is_err());
    }

    #[test]
    fn test_deserialize_transfer() {
        let tx: TonTransfer = serde_json::from_str(&format!(
            r#"{{"walletVersion":"v4r2","address":"{}","seqno":2,"timeout":"{}","messages":[{{"destination":"{}","amount":"5"}}]}}"#,
            WALLET, TIMEOUT, WALLET
        ))
        .unwrap();
        assert_eq!(tx.wallet_version, WalletVersion::V4R2);
        assert_eq!(tx.timeout, Some(TIMEOUT));
        assert!(tx.validate().is_ok());
    }
}
