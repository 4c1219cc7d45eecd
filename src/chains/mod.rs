//! Per-chain transaction encoders

pub mod cosmos;
pub mod dot;
pub mod evm;
pub mod ton;
pub mod tron;
pub mod utxo;
