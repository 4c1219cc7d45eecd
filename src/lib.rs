//! wasm-wallet-core: chain-agnostic signing core for a multi-chain wallet
//!
//! This crate provides:
//! - An unsigned message and transaction model shared by every chain
//! - Per-chain encoders producing signing payloads and broadcast bytes
//!   (BTC, EVM, DOT, TON, Tron, Cosmos)
//! - UTXO coin selection with fee and change estimation
//! - Message-signing preimages (EIP-191/712, BIP-137/322, TON Connect, ADR-36, ...)
//! - Normalization of dApp provider requests into signing intents
//!
//! # Architecture
//!
//! - **Core layer** (`src/*`): Pure Rust logic, no key material, no I/O
//! - **WASM layer** (`src/wasm/*.rs`): Thin wrappers with `#[wasm_bindgen]`

pub mod chain;
pub mod chains;
pub mod config;
pub mod dapp;
pub mod error;
pub mod message;
pub mod model;
pub mod primitives;
pub mod selection;
pub mod wasm;

// re-export bitcoin from the miniscript crate
pub use ::miniscript::bitcoin;

pub use chain::ChainFamily;
pub use config::CoreConfig;
pub use error::{ErrorKind, Result, WasmWalletError};
pub use message::build_message_payload;
pub use model::{Encoder, SignedPayload, SigningPayload, UnsignedMessage, UnsignedTransaction};
pub use selection::{select, SelectionResult, SelectionStrategy};
pub use wasm::{DappNamespace, EncoderNamespace, MessageNamespace, SelectionNamespace};
