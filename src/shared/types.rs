use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ts_rs::TS;

use crate::shared::error::AppError;

/// Currencies the converter understands.
///
/// The set is closed: detection patterns, the fallback table and the
/// currency selector are all keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum CurrencyCode {
    Usd,
    Eur,
    Gbp,
    Jpy,
    Sgd,
    Aud,
    Cny,
    Thb,
    Idr,
    Krw,
    Hkd,
    Inr,
    Myr,
}

impl CurrencyCode {
    pub const ALL: [CurrencyCode; 13] = [
        CurrencyCode::Usd,
        CurrencyCode::Eur,
        CurrencyCode::Gbp,
        CurrencyCode::Jpy,
        CurrencyCode::Sgd,
        CurrencyCode::Aud,
        CurrencyCode::Cny,
        CurrencyCode::Thb,
        CurrencyCode::Idr,
        CurrencyCode::Krw,
        CurrencyCode::Hkd,
        CurrencyCode::Inr,
        CurrencyCode::Myr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyCode::Usd => "USD",
            CurrencyCode::Eur => "EUR",
            CurrencyCode::Gbp => "GBP",
            CurrencyCode::Jpy => "JPY",
            CurrencyCode::Sgd => "SGD",
            CurrencyCode::Aud => "AUD",
            CurrencyCode::Cny => "CNY",
            CurrencyCode::Thb => "THB",
            CurrencyCode::Idr => "IDR",
            CurrencyCode::Krw => "KRW",
            CurrencyCode::Hkd => "HKD",
            CurrencyCode::Inr => "INR",
            CurrencyCode::Myr => "MYR",
        }
    }

    /// Display symbol placed before a formatted amount, if the currency has one.
    pub fn symbol(&self) -> Option<&'static str> {
        match self {
            CurrencyCode::Usd => Some("$"),
            CurrencyCode::Eur => Some("€"),
            CurrencyCode::Gbp => Some("£"),
            CurrencyCode::Jpy => Some("¥"),
            CurrencyCode::Myr => Some("RM"),
            CurrencyCode::Sgd => Some("S$"),
            CurrencyCode::Aud => Some("A$"),
            CurrencyCode::Hkd => Some("HK$"),
            CurrencyCode::Inr => Some("₹"),
            CurrencyCode::Krw => Some("₩"),
            CurrencyCode::Cny | CurrencyCode::Thb | CurrencyCode::Idr => None,
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        CurrencyCode::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == code)
            .ok_or_else(|| AppError::Validation(format!("Currency not supported: {}", s)))
    }
}

/// Where a cached rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Provenance {
    Live,
    Fallback,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Live => f.write_str("live"),
            Provenance::Fallback => f.write_str("fallback"),
        }
    }
}

// ---- Serde helpers ----
//
// Decimals cross every serialization boundary as strings so precision
// survives JSON consumers that parse numbers as doubles.

pub(crate) fn serialize_decimal<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

pub(crate) fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(serde_json::Number),
        Str(String),
    }

    match NumOrString::deserialize(deserializer)? {
        NumOrString::Num(n) => parse_decimal(&n.to_string()).ok_or_else(|| serde::de::Error::custom("invalid decimal number")),
        NumOrString::Str(s) => parse_decimal(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid decimal string: {}", s))),
    }
}

/// Parse a plain or scientific-notation decimal literal.
pub(crate) fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}
