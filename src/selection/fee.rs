//! Fee rates with sub-satoshi precision

use crate::error::{Result, WasmWalletError};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Satoshis per virtual byte, stored in sat/kvB so `"1.5"` is representable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FeeRate {
    sat_per_kvb: u64,
}

impl FeeRate {
    pub const ZERO: FeeRate = FeeRate { sat_per_kvb: 0 };

    pub fn from_sat_per_vb(sat_per_vb: u64) -> Self {
        FeeRate {
            sat_per_kvb: sat_per_vb.saturating_mul(1000),
        }
    }

    pub fn from_sat_per_kvb(sat_per_kvb: u64) -> Self {
        FeeRate { sat_per_kvb }
    }

    pub fn sat_per_kvb(&self) -> u64 {
        self.sat_per_kvb
    }

    /// Fee for `vsize` virtual bytes, rounded up
    pub fn fee_for_vsize(&self, vsize: u64) -> Result<u64> {
        vsize
            .checked_mul(self.sat_per_kvb)
            .map(|milli| milli.div_ceil(1000))
            .ok_or_else(|| WasmWalletError::overflow("fee exceeds u64"))
    }
}

impl FromStr for FeeRate {
    type Err = WasmWalletError;

    /// Decimal sat/vB with up to three fractional digits
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || WasmWalletError::Validation(format!("Invalid fee rate '{}'", s));
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > 3 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let frac_milli: u64 = if frac.is_empty() {
            0
        } else {
            format!("{:0<3}", frac).parse().map_err(|_| invalid())?
        };
        whole
            .checked_mul(1000)
            .and_then(|w| w.checked_add(frac_milli))
            .map(FeeRate::from_sat_per_kvb)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.sat_per_kvb / 1000;
        let frac = self.sat_per_kvb % 1000;
        if frac == 0 {
            write!(f, "{}", whole)
        } else {
            let frac = format!("{:03}", frac);
            write!(f, "{}.{}", whole, frac.trim_end_matches('0'))
        }
    }
}

impl Serialize for FeeRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FeeRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FeeRateVisitor;

        impl<'de> de::Visitor<'de> for FeeRateVisitor {
            type Value = FeeRate;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a fee rate in sat/vB as number or decimal string")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<FeeRate, E> {
                Ok(FeeRate::from_sat_per_vb(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<FeeRate, E> {
                u64::try_from(value)
                    .map(FeeRate::from_sat_per_vb)
                    .map_err(|_| E::custom("negative fee rate"))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<FeeRate, E> {
                if !(value >= 0.0 && value.is_finite()) {
                    return Err(E::custom("fee rate must be a non-negative number"));
                }
                Ok(FeeRate::from_sat_per_kvb((value * 1000.0).round() as u64))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<FeeRate, E> {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(FeeRateVisitor)
    }
}
