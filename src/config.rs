//! Configuration with serde defaults
//!
//! Every field has a default, so `{}` is a valid configuration.

use crate::chains::utxo::{ScriptType, UtxoNetwork};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Policy knobs for coin selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionPolicy {
    /// Outputs (and change) at or below this value are not created
    pub dust_threshold: u64,
    /// Units with fewer confirmations are ignored by the default strategy
    pub min_confirmations: u32,
    /// Let the default strategy spend units below the dust threshold
    pub spend_dust: bool,
    pub change_script_type: ScriptType,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        SelectionPolicy::for_network(UtxoNetwork::Bitcoin)
    }
}

impl SelectionPolicy {
    pub fn for_network(network: UtxoNetwork) -> Self {
        let (dust_threshold, change_script_type) = match network {
            UtxoNetwork::Bitcoin | UtxoNetwork::Testnet | UtxoNetwork::Regtest => {
                (546, ScriptType::P2wpkh)
            }
            UtxoNetwork::Litecoin => (5_460, ScriptType::P2wpkh),
            UtxoNetwork::Dogecoin => (1_000_000, ScriptType::P2pkh),
        };
        SelectionPolicy {
            dust_threshold,
            min_confirmations: 0,
            spend_dust: false,
            change_script_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TonConfig {
    /// Added to the current time when a transfer has no explicit timeout
    pub default_timeout_secs: u64,
    /// PAY_GAS_SEPARATELY | IGNORE_ERRORS
    pub default_send_mode: u8,
    /// Global id the dApp proxy accepts for `sendTransaction`
    pub mainnet_network_id: String,
}

impl Default for TonConfig {
    fn default() -> Self {
        TonConfig {
            default_timeout_secs: 60,
            default_send_mode: 3,
            mainnet_network_id: "-239".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TronConfig {
    pub expiration_ms: u64,
    /// Fee limit applied to smart contract calls without one, in sun
    pub default_fee_limit: u64,
}

impl Default for TronConfig {
    fn default() -> Self {
        TronConfig {
            expiration_ms: 60_000,
            default_fee_limit: 100_000_000,
        }
    }
}

/// Pallet and call indices for the balances calls we encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DotConfig {
    pub balances_pallet: u8,
    pub transfer_allow_death: u8,
    pub transfer_keep_alive: u8,
    pub transfer_all: u8,
}

impl Default for DotConfig {
    /// Polkadot relay chain indices
    fn default() -> Self {
        DotConfig {
            balances_pallet: 5,
            transfer_allow_death: 0,
            transfer_keep_alive: 3,
            transfer_all: 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreConfig {
    pub selection: SelectionPolicy,
    pub ton: TonConfig,
    pub tron: TronConfig,
    pub dot: DotConfig,
}

impl CoreConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
