//! Exact decimal monetary value.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ErrorKind, LedgerError};

/// Exact decimal amount of money.
///
/// Backed by [`Decimal`], so arithmetic never goes through floating point.
/// The ledger is single-currency; there is no currency tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Parses a decimal string such as `"100"`, `"0.25"` or `"1e3"`.
    ///
    /// Empty input, surrounding whitespace, digit separators and anything the
    /// decimal type cannot represent exactly are rejected with `InvalidAmount`.
    /// Sign is not checked here; use [`Money::is_positive`] or
    /// [`Money::is_non_negative`].
    pub fn parse(text: &str) -> Result<Self, LedgerError> {
        if text.is_empty() {
            return Err(LedgerError::new(
                ErrorKind::InvalidAmount,
                "amount must not be empty",
            ));
        }
        if text.trim() != text || text.contains('_') {
            return Err(invalid_decimal(text, "unexpected characters"));
        }

        match text.split_once(['e', 'E']) {
            Some((mantissa, exponent)) => parse_scientific(text, mantissa, exponent).map(Self),
            None => Decimal::from_str_exact(text)
                .map(Self)
                .map_err(|e| invalid_decimal(text, &e.to_string())),
        }
    }

    pub fn from_decimal(value: Decimal) -> Self {
        Self(value)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// True when strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// True when zero or greater.
    pub fn is_non_negative(&self) -> bool {
        self.0 >= Decimal::ZERO
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }
}

/// Shifts an exactly parsed mantissa by the exponent. Fails instead of
/// rounding when the result needs more than 28 fractional digits or
/// overflows.
fn parse_scientific(text: &str, mantissa: &str, exponent: &str) -> Result<Decimal, LedgerError> {
    let mantissa = Decimal::from_str_exact(mantissa)
        .map_err(|e| invalid_decimal(text, &e.to_string()))?
        .normalize();
    let exponent: i64 = exponent
        .parse()
        .map_err(|_| invalid_decimal(text, "invalid exponent"))?;

    if mantissa.is_zero() {
        return Ok(Decimal::ZERO);
    }

    if exponent < 0 {
        let scale = u32::try_from(exponent.unsigned_abs())
            .ok()
            .and_then(|shift| shift.checked_add(mantissa.scale()))
            .ok_or_else(|| invalid_decimal(text, "too many fractional digits"))?;
        let mut value = mantissa;
        value
            .set_scale(scale)
            .map_err(|_| invalid_decimal(text, "too many fractional digits"))?;
        return Ok(value);
    }

    let mut value = mantissa;
    for _ in 0..exponent {
        value = value
            .checked_mul(Decimal::TEN)
            .ok_or_else(|| invalid_decimal(text, "value out of range"))?;
    }
    Ok(value)
}

fn invalid_decimal(text: &str, reason: &str) -> LedgerError {
    LedgerError::new(
        ErrorKind::InvalidAmount,
        format!("invalid decimal {:?}: {}", text, reason),
    )
}

/// Canonical form: no trailing fractional zeros, no negative zero.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Money {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

// Serialized as a decimal string so JSON consumers never see a float.
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Money::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        Money::parse(s).unwrap()
    }

    #[test]
    fn test_parse_plain_decimals() {
        assert_eq!(money("100").to_string(), "100");
        assert_eq!(money("100.50").to_string(), "100.5");
        assert_eq!(money("0.01").to_string(), "0.01");
        assert_eq!(money("-3").to_string(), "-3");
    }

    #[test]
    fn test_parse_scientific() {
        assert_eq!(money("1e3").to_string(), "1000");
        assert_eq!(money("2.5E-2").to_string(), "0.025");
        assert_eq!(money("1.5e+2").to_string(), "150");
        assert_eq!(money("-4e1").to_string(), "-40");
        assert_eq!(money("0e99").to_string(), "0");
        assert_eq!(money("1e-28").to_string(), "0.0000000000000000000000000001");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for input in [
            "",
            "abc",
            "1.2.3",
            " 10",
            "10 ",
            "1_000",
            "--1",
            "12abc",
            "e5",
            "1e",
            "1e2.5",
            "1.00000000000000000000000000001e0",
            "1e-29",
            "1e40",
        ] {
            let err = Money::parse(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidAmount, "input {:?}", input);
        }
    }

    #[test]
    fn test_format_drops_trailing_zeros() {
        assert_eq!(money("100.00").to_string(), "100");
        assert_eq!(money("0.50").to_string(), "0.5");
        assert_eq!(money("-0").to_string(), "0");
    }

    #[test]
    fn test_format_round_trips_exactly() {
        let original = money("12345678901234567890.123456789");
        let reparsed = money(&original.to_string());
        assert_eq!(original, reparsed);
        assert_eq!(reparsed.to_string(), "12345678901234567890.123456789");
    }

    #[test]
    fn test_sign_checks() {
        assert!(money("0.0001").is_positive());
        assert!(!money("0").is_positive());
        assert!(!money("-1").is_positive());
        assert!(money("0").is_non_negative());
        assert!(!money("-0.01").is_non_negative());
    }

    #[test]
    fn test_arithmetic_keeps_precision() {
        let a = money("0.1");
        let b = money("0.2");
        assert_eq!(a.checked_add(b).unwrap(), money("0.3"));
        assert_eq!(money("1000").checked_sub(money("100")).unwrap(), money("900"));
        assert_eq!(money("1.10").checked_sub(money("0.1")).unwrap(), money("1"));
    }

    #[test]
    fn test_comparison_ignores_scale() {
        assert_eq!(money("100"), money("100.000"));
        assert!(money("99.99") < money("100"));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&money("10.50")).unwrap();
        assert_eq!(json, "\"10.5\"");
        let back: Money = serde_json::from_str("\"7.25\"").unwrap();
        assert_eq!(back, money("7.25"));
        assert!(serde_json::from_str::<Money>("\"seven\"").is_err());
    }
}
