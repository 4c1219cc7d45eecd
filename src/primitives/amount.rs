//! Serde helpers for integer amounts
//!
//! JS callers send amounts as numbers or as decimal/`0x` hex strings. Outgoing
//! amounts are always strings so that nothing above 2^53 loses precision.

use alloy_primitives::U256;
use serde::{de, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Parse an unsigned integer from a decimal or `0x`-prefixed hex string
pub fn parse_uint(value: &str) -> Result<u128, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("empty integer string".to_string());
    }
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u128::from_str_radix(hex, 16).map_err(|e| format!("{}: {}", value, e)),
        None => value.parse().map_err(|e| format!("{}: {}", value, e)),
    }
}

pub fn parse_u256(value: &str) -> Result<U256, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("empty integer string".to_string());
    }
    U256::from_str(value).map_err(|e| format!("{}: {}", value, e))
}

struct UintVisitor;

impl<'de> de::Visitor<'de> for UintVisitor {
    type Value = u128;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an unsigned integer as number or string")
    }

    fn visit_u64<E>(self, value: u64) -> Result<u128, E>
    where
        E: de::Error,
    {
        Ok(value as u128)
    }

    fn visit_u128<E>(self, value: u128) -> Result<u128, E>
    where
        E: de::Error,
    {
        Ok(value)
    }

    fn visit_i64<E>(self, value: i64) -> Result<u128, E>
    where
        E: de::Error,
    {
        if value >= 0 {
            Ok(value as u128)
        } else {
            Err(E::custom("negative values not allowed"))
        }
    }

    fn visit_f64<E>(self, value: f64) -> Result<u128, E>
    where
        E: de::Error,
    {
        // JS numbers arrive as f64; only exact safe integers are accepted
        if value >= 0.0 && value.fract() == 0.0 && value <= 9_007_199_254_740_991.0 {
            Ok(value as u128)
        } else {
            Err(E::custom(format!("{} is not a safe unsigned integer", value)))
        }
    }

    fn visit_str<E>(self, value: &str) -> Result<u128, E>
    where
        E: de::Error,
    {
        parse_uint(value).map_err(E::custom)
    }
}

fn deserialize_uint<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u128>,
{
    let value = deserializer.deserialize_any(UintVisitor)?;
    T::try_from(value).map_err(|_| de::Error::custom(format!("{} out of range", value)))
}

/// `u64` read from number or string, written as a decimal string
pub mod u64_str {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        super::deserialize_uint(deserializer)
    }
}

pub mod u128_str {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        super::deserialize_uint(deserializer)
    }
}

pub mod opt_u64_str {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "super::u64_str")] u64);

        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
    }
}

pub mod opt_u128_str {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u128>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "super::u128_str")] u128);

        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
    }
}

struct U256Visitor;

impl<'de> de::Visitor<'de> for U256Visitor {
    type Value = U256;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a 256-bit unsigned integer as number or string")
    }

    fn visit_u64<E>(self, value: u64) -> Result<U256, E>
    where
        E: de::Error,
    {
        Ok(U256::from(value))
    }

    fn visit_i64<E>(self, value: i64) -> Result<U256, E>
    where
        E: de::Error,
    {
        u64::try_from(value)
            .map(U256::from)
            .map_err(|_| E::custom("negative values not allowed"))
    }

    fn visit_f64<E>(self, value: f64) -> Result<U256, E>
    where
        E: de::Error,
    {
        de::Visitor::visit_f64(UintVisitor, value).map(U256::from)
    }

    fn visit_str<E>(self, value: &str) -> Result<U256, E>
    where
        E: de::Error,
    {
        parse_u256(value).map_err(E::custom)
    }
}

/// `U256` read from number, decimal or hex string; written as a decimal string
pub mod u256_str {
    use alloy_primitives::U256;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        deserializer.deserialize_any(super::U256Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Deserialize, Serialize)]
    struct Amounts {
        #[serde(with = "u64_str")]
        small: u64,
        #[serde(with = "u128_str")]
        big: u128,
        #[serde(with = "u256_str")]
        wei: U256,
        #[serde(default, with = "opt_u64_str")]
        maybe: Option<u64>,
    }

    #[test]
    fn test_number_or_string() {
        let parsed: Amounts = serde_json::from_str(
            r#"{"small": 42, "big": "340282366920938463463374607431768211455", "wei": "0x10", "maybe": "7"}"#,
        )
        .unwrap();
        assert_eq!(parsed.small, 42);
        assert_eq!(parsed.big, u128::MAX);
        assert_eq!(parsed.wei, U256::from(16u64));
        assert_eq!(parsed.maybe, Some(7));

        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["small"], "42");
        assert_eq!(json["wei"], "16");
    }

    #[test]
    fn test_rejects_negative_and_overflow() {
        assert!(serde_json::from_str::<Amounts>(r#"{"small": -1, "big": 0, "wei": 0}"#).is_err());
        assert!(serde_json::from_str::<Amounts>(
            r#"{"small": "18446744073709551616", "big": 0, "wei": 0}"#
        )
        .is_err());
    }

    #[test]
    fn test_parse_uint_hex() {
        assert_eq!(parse_uint("0xff").unwrap(), 255);
        assert_eq!(parse_uint(" 10 ").unwrap(), 10);
        assert!(parse_uint("").is_err());
        assert!(parse_uint("1.5").is_err());
    }
}
