//! Error types for wasm-wallet-core

use wasm_bindgen::prelude::*;

/// Coarse classification of [`WasmWalletError`], stable across variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    LimitExceeded,
    InsufficientFunds,
    SerializationOverflow,
    UnsupportedVariant,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::LimitExceeded => "LimitExceededError",
            ErrorKind::InsufficientFunds => "InsufficientFundsError",
            ErrorKind::SerializationOverflow => "SerializationOverflow",
            ErrorKind::UnsupportedVariant => "UnsupportedVariantError",
        }
    }
}

/// Main error type for wasm-wallet-core operations
///
/// Every failure is deterministic for a given input, so nothing here is retryable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WasmWalletError {
    /// Malformed or contradictory intent
    #[error("Validation error: {0}")]
    Validation(String),

    /// A message kind paired with a payload of another family, or similar
    #[error("Invalid field combination: {0}")]
    InvalidFieldCombination(String),

    /// Protocol hard limit, e.g. messages per wallet transfer
    #[error("Batch limit exceeded: {actual} items, at most {limit} allowed")]
    BatchLimitExceeded { limit: usize, actual: usize },

    /// Selection could not cover the target; `shortfall = required - available`
    #[error("Insufficient funds: required {required}, available {available}, short by {shortfall}")]
    InsufficientFunds {
        required: u64,
        available: u64,
        shortfall: u64,
    },

    /// A value did not fit its fixed-width field. Should not happen with validated input.
    #[error("Serialization overflow: {0}")]
    SerializationOverflow(String),

    #[error("Unsupported chain variant: {0}")]
    UnsupportedChainVariant(String),
}

impl WasmWalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WasmWalletError::Validation(_) | WasmWalletError::InvalidFieldCombination(_) => {
                ErrorKind::Validation
            }
            WasmWalletError::BatchLimitExceeded { .. } => ErrorKind::LimitExceeded,
            WasmWalletError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            WasmWalletError::SerializationOverflow(_) => ErrorKind::SerializationOverflow,
            WasmWalletError::UnsupportedChainVariant(_) => ErrorKind::UnsupportedVariant,
        }
    }

    /// Builds an overflow error and records it, since it indicates a defect upstream
    pub fn overflow(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::error!(%msg, "serialization overflow");
        WasmWalletError::SerializationOverflow(msg)
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        WasmWalletError::UnsupportedChainVariant(msg.into())
    }
}

impl From<&str> for WasmWalletError {
    fn from(s: &str) -> Self {
        WasmWalletError::Validation(s.to_string())
    }
}

impl From<String> for WasmWalletError {
    fn from(s: String) -> Self {
        WasmWalletError::Validation(s)
    }
}

impl From<hex::FromHexError> for WasmWalletError {
    fn from(err: hex::FromHexError) -> Self {
        WasmWalletError::Validation(format!("Invalid hex: {}", err))
    }
}

impl From<serde_json::Error> for WasmWalletError {
    fn from(err: serde_json::Error) -> Self {
        WasmWalletError::Validation(format!("Invalid JSON: {}", err))
    }
}

impl From<parity_scale_codec::Error> for WasmWalletError {
    fn from(err: parity_scale_codec::Error) -> Self {
        WasmWalletError::Validation(format!("Invalid SCALE encoding: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, WasmWalletError>;

// Converts to JS Error with stack trace; `name` carries the error kind
impl From<WasmWalletError> for JsValue {
    fn from(err: WasmWalletError) -> Self {
        let js_err = js_sys::Error::new(&err.to_string());
        js_err.set_name(err.kind().as_str());
        js_err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WasmWalletError::BatchLimitExceeded {
            limit: 4,
            actual: 5,
        };
        assert_eq!(
            err.to_string(),
            "Batch limit exceeded: 5 items, at most 4 allowed"
        );
        assert_eq!(err.kind(), ErrorKind::LimitExceeded);
    }

    #[test]
    fn test_from_str() {
        let err: WasmWalletError = "test error".into();
        assert_eq!(err.to_string(), "Validation error: test error");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_from_scale_error() {
        use parity_scale_codec::{Compact, Decode};
        let err: WasmWalletError = Compact::<u32>::decode(&mut &[0x01u8][..]).unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().starts_with("Validation error: Invalid SCALE encoding"));
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            WasmWalletError::InvalidFieldCombination("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            WasmWalletError::unsupported("x").kind(),
            ErrorKind::UnsupportedVariant
        );
        assert_eq!(
            WasmWalletError::overflow("x").kind(),
            ErrorKind::SerializationOverflow
        );
    }
}
