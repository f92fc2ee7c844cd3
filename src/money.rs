//! Human-readable price parsing.
//!
//! Converts operator-facing amounts like `"0.1"` or `"1,000 VARA"` into
//! atomic units for challenges, rejecting anything that would silently lose
//! precision.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

use crate::types::AtomicAmount;

/// A price-like numeric value in human-readable form.
#[derive(Debug, Clone, PartialEq)]
pub struct MoneyAmount(pub Decimal);

#[derive(Debug, thiserror::Error)]
pub enum MoneyAmountParseError {
    #[error("Invalid number format")]
    InvalidFormat,
    #[error(
        "Amount must be between {} and {}",
        bounds::MIN_STR,
        bounds::MAX_STR
    )]
    OutOfRange,
    #[error("Negative value is not allowed")]
    Negative,
    #[error("Too many decimal places: {money} vs {decimals} on the token")]
    WrongPrecision { money: u32, decimals: u32 },
}

mod bounds {
    use super::*;

    pub const MIN_STR: &str = "0.000000000001";
    pub const MAX_STR: &str = "999999999";

    pub static MIN: Lazy<Decimal> =
        Lazy::new(|| Decimal::from_str(MIN_STR).expect("valid decimal"));
    pub static MAX: Lazy<Decimal> =
        Lazy::new(|| Decimal::from_str(MAX_STR).expect("valid decimal"));
}

impl MoneyAmount {
    /// Parse a human-entered amount, ignoring currency symbols and digit
    /// separators.
    pub fn parse(input: &str) -> Result<Self, MoneyAmountParseError> {
        static CLEANUP: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"[^\d\.\-]+").expect("valid cleanup regex"));
        let cleaned = CLEANUP.replace_all(input, "").to_string();

        let parsed =
            Decimal::from_str(&cleaned).map_err(|_| MoneyAmountParseError::InvalidFormat)?;
        if parsed.is_sign_negative() {
            return Err(MoneyAmountParseError::Negative);
        }
        if parsed < *bounds::MIN || parsed > *bounds::MAX {
            return Err(MoneyAmountParseError::OutOfRange);
        }
        Ok(MoneyAmount(parsed))
    }

    /// Digits after the decimal point in the original input.
    pub fn scale(&self) -> u32 {
        self.0.scale()
    }

    /// Absolute mantissa of the decimal value.
    pub fn mantissa(&self) -> u128 {
        self.0.mantissa().unsigned_abs()
    }

    /// Convert to atomic units for a token with `decimals` decimal places.
    ///
    /// `"0.1"` becomes `100_000_000_000` atomic units for the native token's
    /// twelve decimals. Fails rather than rounding when the input carries
    /// more precision than the token can represent.
    pub fn as_atomic(&self, decimals: u32) -> Result<AtomicAmount, MoneyAmountParseError> {
        let scale = self.scale();
        if scale > decimals {
            return Err(MoneyAmountParseError::WrongPrecision {
                money: scale,
                decimals,
            });
        }
        let multiplier = 10u128.pow(decimals - scale);
        let value = self
            .mantissa()
            .checked_mul(multiplier)
            .ok_or(MoneyAmountParseError::OutOfRange)?;
        Ok(AtomicAmount(value))
    }
}

impl FromStr for MoneyAmount {
    type Err = MoneyAmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MoneyAmount::parse(s)
    }
}

impl TryFrom<&str> for MoneyAmount {
    type Error = MoneyAmountParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        MoneyAmount::from_str(value)
    }
}

impl From<u128> for MoneyAmount {
    fn from(value: u128) -> Self {
        MoneyAmount(Decimal::from(value))
    }
}

impl Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_decorated_amounts() {
        assert_eq!(MoneyAmount::parse("0.1").unwrap().to_string(), "0.1");
        assert_eq!(MoneyAmount::parse("1,000 VARA").unwrap().to_string(), "1000");
    }

    #[test]
    fn rejects_negative_and_garbage() {
        assert!(matches!(
            MoneyAmount::parse("-1"),
            Err(MoneyAmountParseError::Negative)
        ));
        assert!(matches!(
            MoneyAmount::parse("lots"),
            Err(MoneyAmountParseError::InvalidFormat)
        ));
    }

    #[test]
    fn converts_to_atomic_units() {
        let amount = MoneyAmount::parse("0.1").unwrap();
        assert_eq!(amount.as_atomic(12).unwrap(), AtomicAmount(100_000_000_000));

        let whole = MoneyAmount::parse("5").unwrap();
        assert_eq!(whole.as_atomic(12).unwrap(), AtomicAmount(5_000_000_000_000));
    }

    #[test]
    fn refuses_precision_loss() {
        let amount = MoneyAmount::parse("0.0000000000001").unwrap_err();
        assert!(matches!(amount, MoneyAmountParseError::OutOfRange));

        let amount = MoneyAmount::parse("0.1234").unwrap();
        assert!(matches!(
            amount.as_atomic(3),
            Err(MoneyAmountParseError::WrongPrecision { .. })
        ));
    }
}
