//! Conversions between human decimal strings and integer base units.

use alloy_primitives::utils::{format_units, parse_units, ParseUnits};
use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::{LaunchpadError, Result};

/// Decimals of the native coin and of every launchpad-minted token.
pub const ETHER_DECIMALS: u8 = 18;

/// An on-chain integer amount together with its display form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenAmount {
    /// Integer base units, base 10.
    pub raw: String,
    pub formatted: String,
}

impl TokenAmount {
    pub fn new(value: U256, decimals: u8) -> Self {
        TokenAmount {
            raw: value.to_string(),
            formatted: format_amount(value, decimals),
        }
    }

    pub fn ether(value: U256) -> Self {
        Self::new(value, ETHER_DECIMALS)
    }
}

/// Parse a decimal string such as `"1.25"` into base units.
pub fn parse_amount(input: &str, decimals: u8) -> Result<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(LaunchpadError::amount(input, "amount is empty"));
    }
    match parse_units(trimmed, decimals) {
        Ok(ParseUnits::U256(value)) => Ok(value),
        Ok(ParseUnits::I256(_)) => Err(LaunchpadError::amount(input, "amount is negative")),
        Err(e) => Err(LaunchpadError::amount(input, e.to_string())),
    }
}

pub fn parse_ether(input: &str) -> Result<U256> {
    parse_amount(input, ETHER_DECIMALS)
}

/// Parse an integer base-unit string (decimal or `0x`-prefixed hex).
pub fn parse_base_units(input: &str) -> Result<U256> {
    input
        .trim()
        .parse::<U256>()
        .map_err(|e| LaunchpadError::amount(input, e.to_string()))
}

/// Format base units as a decimal string with trailing zeros trimmed,
/// keeping at least one fractional digit (`1.0`, `0.25`).
pub fn format_amount(value: U256, decimals: u8) -> String {
    match format_units(value, decimals) {
        Ok(formatted) => trim_fraction(formatted),
        Err(_) => value.to_string(),
    }
}

pub fn format_ether(value: U256) -> String {
    format_amount(value, ETHER_DECIMALS)
}

fn trim_fraction(mut formatted: String) -> String {
    if !formatted.contains('.') {
        formatted.push_str(".0");
        return formatted;
    }
    while formatted.ends_with('0') {
        formatted.pop();
    }
    if formatted.ends_with('.') {
        formatted.push('0');
    }
    formatted
}

/// Accepts `"1.5"` as well as `1.5` for amount fields in request bodies.
pub fn decimal_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a decimal string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn parses_whole_and_fractional_ether() {
        assert_eq!(parse_ether("1").unwrap(), U256::from(ONE_ETHER));
        assert_eq!(parse_ether("0.5").unwrap(), U256::from(ONE_ETHER / 2));
        assert_eq!(parse_ether(" 2.25 ").unwrap(), U256::from(ONE_ETHER * 9 / 4));
        assert_eq!(
            parse_amount("1000000", ETHER_DECIMALS).unwrap(),
            U256::from(1_000_000u64) * U256::from(ONE_ETHER)
        );
    }

    #[test]
    fn rejects_bad_amounts() {
        assert!(matches!(parse_ether(""), Err(LaunchpadError::Amount { .. })));
        assert!(matches!(parse_ether("abc"), Err(LaunchpadError::Amount { .. })));
        assert!(matches!(parse_ether("-1"), Err(LaunchpadError::Amount { .. })));
    }

    #[test]
    fn formats_like_a_wallet() {
        assert_eq!(format_ether(U256::from(ONE_ETHER)), "1.0");
        assert_eq!(format_ether(U256::from(ONE_ETHER * 3 / 2)), "1.5");
        assert_eq!(format_ether(U256::ZERO), "0.0");
        assert_eq!(format_ether(U256::from(1u64)), "0.000000000000000001");
        assert_eq!(format_amount(U256::from(1_500_000u64), 6), "1.5");
    }

    #[test]
    fn token_amount_keeps_raw_digits() {
        let amount = TokenAmount::ether(U256::from(ONE_ETHER / 4));
        assert_eq!(amount.raw, "250000000000000000");
        assert_eq!(amount.formatted, "0.25");
    }

    #[test]
    fn base_units_accept_decimal_and_hex() {
        assert_eq!(parse_base_units("1000").unwrap(), U256::from(1000u64));
        assert_eq!(parse_base_units("0x10").unwrap(), U256::from(16u64));
        assert!(parse_base_units("1.5").is_err());
    }

    #[test]
    fn decimal_string_accepts_numbers() {
        #[derive(Deserialize)]
        struct Body {
            #[serde(deserialize_with = "decimal_string")]
            amount: String,
        }
        let from_number: Body = serde_json::from_str(r#"{"amount": 1.5}"#).unwrap();
        assert_eq!(from_number.amount, "1.5");
        let from_string: Body = serde_json::from_str(r#"{"amount": "2"}"#).unwrap();
        assert_eq!(from_string.amount, "2");
        assert!(serde_json::from_str::<Body>(r#"{"amount": true}"#).is_err());
    }
}
