//! Chain families and network identifiers

use crate::error::{Result, WasmWalletError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The chain families this core can encode for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    Btc,
    Evm,
    Ton,
    Tron,
    Cosmos,
    Dot,
    Sol,
}

impl ChainFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainFamily::Btc => "btc",
            ChainFamily::Evm => "evm",
            ChainFamily::Ton => "ton",
            ChainFamily::Tron => "tron",
            ChainFamily::Cosmos => "cosmos",
            ChainFamily::Dot => "dot",
            ChainFamily::Sol => "sol",
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainFamily {
    type Err = WasmWalletError;

    /// Accepts family names and the common impl aliases used in network ids
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "btc" | "tbtc" | "sbtc" | "ltc" | "doge" => Ok(ChainFamily::Btc),
            "evm" | "eth" => Ok(ChainFamily::Evm),
            "ton" => Ok(ChainFamily::Ton),
            "tron" | "trx" => Ok(ChainFamily::Tron),
            "cosmos" => Ok(ChainFamily::Cosmos),
            "dot" => Ok(ChainFamily::Dot),
            "sol" => Ok(ChainFamily::Sol),
            other => Err(WasmWalletError::unsupported(format!(
                "unknown chain family '{}'",
                other
            ))),
        }
    }
}

/// A network id in the `<impl>--<chainId>` form, e.g. `evm--1` or `cosmos--cosmoshub-4`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkId {
    pub family: ChainFamily,
    /// The impl segment as written, e.g. `ltc` for `ltc--0`
    pub impl_name: String,
    pub chain_id: Option<String>,
}

impl NetworkId {
    /// Numeric chain id, as EVM networks use
    pub fn numeric_chain_id(&self) -> Result<u64> {
        let id = self
            .chain_id
            .as_deref()
            .ok_or_else(|| WasmWalletError::Validation(format!("{} has no chain id", self)))?;
        id.parse()
            .map_err(|_| WasmWalletError::Validation(format!("chain id '{}' is not numeric", id)))
    }
}

impl FromStr for NetworkId {
    type Err = WasmWalletError;

    fn from_str(s: &str) -> Result<Self> {
        let (impl_name, chain_id) = match s.split_once("--") {
            Some((name, id)) if !id.is_empty() => (name, Some(id.to_string())),
            Some(_) => return Err(format!("network id '{}' has an empty chain id", s).into()),
            None => (s, None),
        };
        Ok(NetworkId {
            family: impl_name.parse()?,
            impl_name: impl_name.to_ascii_lowercase(),
            chain_id,
        })
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.chain_id {
            Some(id) => write!(f, "{}--{}", self.impl_name, id),
            None => f.write_str(&self.impl_name),
        }
    }
}
