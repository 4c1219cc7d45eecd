//! Internal and external message cells

use super::address::TonAddress;
use super::boc::parse_boc_base64;
use super::cell::{snake_cell, Cell, CellBuilder, MAX_REFS};
use crate::error::{Result, WasmWalletError};
use crate::primitives::amount::u128_str;
use serde::{Deserialize, Serialize};

/// op code of a text comment body
const COMMENT_OP: u32 = 0;
/// `transfer` op from the jetton wallet interface (TEP-74)
pub const JETTON_TRANSFER_OP: u32 = 0x0f8a_7ea5;

/// What an internal message carries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageBody {
    #[default]
    Empty,
    Comment { text: String },
    /// base64 BoC, used as is
    Raw { boc: String },
    /// The enclosing message goes to the sender's jetton wallet
    #[serde(rename_all = "camelCase")]
    JettonTransfer {
        #[serde(default)]
        query_id: u64,
        #[serde(with = "u128_str")]
        amount: u128,
        /// Owner that receives the jettons
        destination: String,
        /// Excess TON goes here; defaults to the sending wallet
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response_destination: Option<String>,
        #[serde(default, with = "u128_str")]
        forward_ton_amount: u128,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        forward_comment: Option<String>,
    },
}

impl MessageBody {
    /// Body cell, or `None` for an empty body
    pub fn to_cell(&self, sender: &TonAddress) -> Result<Option<Cell>> {
        match self {
            MessageBody::Empty => Ok(None),
            MessageBody::Comment { text } => comment_cell(text).map(Some),
            MessageBody::Raw { boc } => parse_boc_base64(boc).map(Some),
            MessageBody::JettonTransfer {
                query_id,
                amount,
                destination,
                response_destination,
                forward_ton_amount,
                forward_comment,
            } => {
                let destination: TonAddress = destination.parse()?;
                let response = match response_destination {
                    Some(address) => address.parse()?,
                    None => *sender,
                };
                let forward = forward_comment
                    .as_deref()
                    .map(comment_cell)
                    .transpose()?;

                let mut b = CellBuilder::new();
                b.store_uint(JETTON_TRANSFER_OP as u128, 32)?
                    .store_uint(*query_id as u128, 64)?
                    .store_coins(*amount)?
                    .store_address(Some(&destination))?
                    .store_address(Some(&response))?
                    // no custom payload
                    .store_bit(false)?
                    .store_coins(*forward_ton_amount)?
                    .store_maybe_ref(forward)?;
                b.build().map(Some)
            }
        }
    }
}

/// Text comment: a zero op followed by snake-encoded UTF-8
pub fn comment_cell(text: &str) -> Result<Cell> {
    let mut prefix = CellBuilder::new();
    prefix.store_uint(COMMENT_OP as u128, 32)?;
    snake_cell(&prefix, text.as_bytes())
}

/// One outgoing transfer from a wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TonMessage {
    pub destination: String,
    /// nanoton
    #[serde(with = "u128_str")]
    pub amount: u128,
    /// Defaults to the destination's bounceable flag; raw addresses do not bounce
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounce: Option<bool>,
    #[serde(default)]
    pub body: MessageBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_mode: Option<u8>,
    /// base64 BoC of a StateInit to deploy at the destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_init: Option<String>,
}

impl TonMessage {
    pub fn destination_address(&self) -> Result<(TonAddress, bool)> {
        let (address, flags) = TonAddress::parse(&self.destination)?;
        let bounce = self
            .bounce
            .unwrap_or_else(|| flags.is_some_and(|f| f.bounceable));
        Ok((address, bounce))
    }

    /// `MessageRelaxed` with `int_msg_info`, zero fees and lt
    pub fn to_internal_cell(&self, sender: &TonAddress) -> Result<Cell> {
        let (destination, bounce) = self.destination_address()?;
        let body = self.body.to_cell(sender)?;
        let init = self.state_init.as_deref().map(parse_boc_base64).transpose()?;

        let mut b = CellBuilder::new();
        b.store_bit(false)? // int_msg_info$0
            .store_bit(true)? // ihr_disabled
            .store_bit(bounce)?
            .store_bit(false)? // bounced
            .store_address(None)?
            .store_address(Some(&destination))?
            .store_coins(self.amount)?
            .store_bit(false)? // no extra currencies
            .store_coins(0)? // ihr_fee
            .store_coins(0)? // fwd_fee
            .store_uint(0, 64)? // created_lt
            .store_uint(0, 32)?; // created_at
        store_init_and_body(&mut b, init.as_ref(), body.as_ref())?;
        b.build()
    }

    pub fn preview(&self) -> String {
        match &self.body {
            MessageBody::JettonTransfer {
                amount,
                destination,
                ..
            } => format!("Transfer {} jetton units to {}", amount, destination),
            _ => format!("Send {} nanoton to {}", self.amount, self.destination),
        }
    }
}

/// External inbound message addressed to a wallet
pub fn external_message(wallet: &TonAddress, init: Option<&Cell>, body: &Cell) -> Result<Cell> {
    let mut b = CellBuilder::new();
    b.store_uint(0b10, 2)? // ext_in_msg_info$10
        .store_address(None)?
        .store_address(Some(wallet))?
        .store_coins(0)?; // import_fee
    store_init_and_body(&mut b, init, Some(body))?;
    b.build()
}

/// `init:(Maybe (Either StateInit ^StateInit)) body:(Either X ^X)`, inlining
/// whatever still fits in the message cell
fn store_init_and_body(b: &mut CellBuilder, init: Option<&Cell>, body: Option<&Cell>) -> Result<()> {
    let empty = Cell::empty();
    let body = body.unwrap_or(&empty);

    match init {
        Some(init) => {
            b.store_bit(true)?;
            let as_ref = b.available_bits() < 2 + init.bit_len() + body.bit_len();
            if as_ref {
                b.store_bit(true)?.store_ref(init.clone())?;
            } else {
                b.store_bit(false)?.store_slice(init)?;
            }
        }
        None => {
            b.store_bit(false)?;
        }
    }

    let as_ref = b.available_bits() < 1 + body.bit_len()
        || b.refs_used() + body.refs().len() > MAX_REFS;
    if as_ref {
        b.store_bit(true)?.store_ref(body.clone())?;
    } else {
        b.store_bit(false)?.store_slice(body)?;
    }
    Ok(())
}

/// Reads the text back out of a comment body
pub fn parse_comment(body: &Cell) -> Result<String> {
    let mut slice = body.parse();
    let op = slice.load_uint(32)?;
    if op != COMMENT_OP as u128 {
        return Err(WasmWalletError::Validation(format!(
            "body op {:#x} is not a comment",
            op
        )));
    }
    let bytes = slice.load_snake_bytes()?;
    String::from_utf8(bytes).map_err(|_| "comment is not valid UTF-8".into())
}
