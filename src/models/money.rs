//! Money type and the decimal <-> minor-unit codec
//!
//! Internally every amount is stored in cents (i64) to avoid floating-point
//! precision issues. Values coming from outside are tagged with [`Amount`] so
//! the caller has to say whether a number is already in cents or is a decimal
//! currency amount that still needs rounding.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::{LedgerError, LedgerResult};

/// Number of fractional digits kept for every currency
pub const MINOR_UNIT_DIGITS: u32 = 2;

/// Represents a monetary amount stored as cents (hundredths of the currency unit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Create a Money amount from cents
    ///
    /// # Examples
    /// ```
    /// use splitledger::models::Money;
    /// let amount = Money::from_cents(1050); // $10.50
    /// assert_eq!(amount.to_string(), "$10.50");
    /// ```
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Create a zero Money amount
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Get the amount in cents
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Get the whole dollars portion (truncated toward zero)
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Get the cents portion (0-99)
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Check if the amount is zero
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Check if the amount is positive
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Check if the amount is negative
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Get the absolute value
    pub const fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Exact decimal value of this amount
    pub fn to_decimal(&self) -> Decimal {
        from_minor_units(self.0)
    }

    /// Format with a currency code instead of a symbol, e.g. `65.70 CAD`
    pub fn format_with_code(&self, code: &str) -> String {
        format!("{} {}", self.to_decimal(), code)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// An amount as supplied by a caller, before conversion to cents
///
/// `Cents` is trusted to already be in minor units; `Decimal` is a currency
/// amount (e.g. `65.70`) that is rounded half-up to two places.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Amount {
    Cents(i64),
    Decimal(Decimal),
}

impl Amount {
    /// Tag a float as a decimal currency amount
    ///
    /// The float goes through its shortest round-trip text form, so `10.005`
    /// is read as the decimal `10.005` and not as its binary approximation.
    pub fn from_f64(value: f64) -> LedgerResult<Self> {
        if !value.is_finite() {
            return Err(LedgerError::InvalidAmount(format!(
                "not a finite number: {value}"
            )));
        }
        parse_decimal(&value.to_string()).map(Self::Decimal)
    }

    /// Parse a user-supplied amount
    ///
    /// Accepts `"65.70"`, `"$65.70"`, `"-3.5"` and `"10"` as decimal currency
    /// amounts, and `"6570c"` as an amount already in cents.
    pub fn parse(s: &str) -> LedgerResult<Self> {
        let s = s.trim();
        if let Some(cents) = s.strip_suffix('c') {
            return cents
                .trim()
                .parse::<i64>()
                .map(Self::Cents)
                .map_err(|_| LedgerError::InvalidAmount(format!("invalid cents amount: {s}")));
        }

        let (negative, rest) = match s.strip_prefix('-') {
            Some(stripped) => (true, stripped),
            None => (false, s),
        };
        let rest = rest.strip_prefix('$').unwrap_or(rest);
        let value = parse_decimal(rest)?;
        Ok(Self::Decimal(if negative { -value } else { value }))
    }

    /// Convert to minor units (see [`to_minor_units`])
    pub fn to_minor_units(&self) -> LedgerResult<i64> {
        to_minor_units(*self)
    }
}

impl From<Money> for Amount {
    fn from(money: Money) -> Self {
        Self::Cents(money.cents())
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl FromStr for Amount {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Convert an amount to integer cents
///
/// Decimal amounts are rounded to two fractional digits with round-half-up
/// (ties move away from zero) and scaled by 100. Cents pass through.
pub fn to_minor_units(amount: Amount) -> LedgerResult<i64> {
    match amount {
        Amount::Cents(cents) => Ok(cents),
        Amount::Decimal(value) => {
            let rounded = value
                .round_dp_with_strategy(MINOR_UNIT_DIGITS, RoundingStrategy::MidpointAwayFromZero);
            rounded
                .checked_mul(Decimal::ONE_HUNDRED)
                .and_then(|scaled| scaled.to_i64())
                .ok_or_else(|| LedgerError::InvalidAmount(format!("amount out of range: {value}")))
        }
    }
}

/// Exact decimal value of an amount in cents
pub fn from_minor_units(cents: i64) -> Decimal {
    Decimal::new(cents, MINOR_UNIT_DIGITS)
}

fn parse_decimal(s: &str) -> LedgerResult<Decimal> {
    Decimal::from_str(s.trim())
        .map_err(|_| LedgerError::InvalidAmount(format!("invalid decimal amount: {s}")))
}

/// Deserialize a decimal from either a JSON number or a JSON string
///
/// Numbers are read through their textual form so `30.4` stays `30.4`.
pub fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    let text = match &value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().trim_start_matches('$').to_string(),
        other => return Err(D::Error::custom(format!("expected a decimal amount, got {other}"))),
    };
    Decimal::from_str(&text).map_err(|e| D::Error::custom(format!("invalid decimal {text}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_cents() {
        let m = Money::from_cents(1050);
        assert_eq!(m.cents(), 1050);
        assert_eq!(m.dollars(), 10);
        assert_eq!(m.cents_part(), 50);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1050)), "$10.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
        assert_eq!(format!("{}", Money::from_cents(-1050)), "-$10.50");
        assert_eq!(format!("{}", Money::from_cents(5)), "$0.05");
        assert_eq!(Money::from_cents(6570).format_with_code("CAD"), "65.70 CAD");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((-a).cents(), -1000);

        let total: Money = vec![a, b, Money::from_cents(1)].into_iter().sum();
        assert_eq!(total.cents(), 1501);
    }

    #[test]
    fn test_half_up_rounding() {
        assert_eq!(to_minor_units(Amount::Decimal(dec!(10.005))).unwrap(), 1001);
        assert_eq!(to_minor_units(Amount::Decimal(dec!(10.004))).unwrap(), 1000);
        assert_eq!(to_minor_units(Amount::Decimal(dec!(-10.005))).unwrap(), -1001);
        assert_eq!(to_minor_units(Amount::Decimal(dec!(0.125))).unwrap(), 13);
    }

    #[test]
    fn test_float_input_uses_shortest_text() {
        let amount = Amount::from_f64(10.005).unwrap();
        assert_eq!(amount.to_minor_units().unwrap(), 1001);
        assert_eq!(Amount::from_f64(65.7).unwrap().to_minor_units().unwrap(), 6570);
        assert!(Amount::from_f64(f64::NAN).is_err());
        assert!(Amount::from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn test_cents_pass_through() {
        assert_eq!(to_minor_units(Amount::Cents(1001)).unwrap(), 1001);
        assert_eq!(to_minor_units(Amount::Cents(-7)).unwrap(), -7);
    }

    #[test]
    fn test_from_minor_units_is_exact() {
        assert_eq!(from_minor_units(1001), dec!(10.01));
        assert_eq!(from_minor_units(-5), dec!(-0.05));
        for cents in [0, 1, -1, 99, 100, 123_456_789, i64::MAX, i64::MIN + 1] {
            let back = to_minor_units(Amount::Decimal(from_minor_units(cents))).unwrap();
            assert_eq!(back, cents);
        }
    }

    #[test]
    fn test_out_of_range_decimal() {
        let huge = Decimal::MAX;
        assert!(matches!(
            to_minor_units(Amount::Decimal(huge)),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_parse() {
        assert_eq!(Amount::parse("10.50").unwrap(), Amount::Decimal(dec!(10.50)));
        assert_eq!(Amount::parse("$10.50").unwrap().to_minor_units().unwrap(), 1050);
        assert_eq!(Amount::parse("-$10.50").unwrap().to_minor_units().unwrap(), -1050);
        assert_eq!(Amount::parse("10").unwrap().to_minor_units().unwrap(), 1000);
        assert_eq!(Amount::parse("10.5").unwrap().to_minor_units().unwrap(), 1050);
        assert_eq!(Amount::parse("1050c").unwrap(), Amount::Cents(1050));
        assert!(Amount::parse("ten").is_err());
        assert!(Amount::parse("12.x").is_err());
    }

    #[test]
    fn test_deserialize_decimal_from_number_and_string() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(deserialize_with = "deserialize_decimal")]
            cost: Decimal,
        }

        let row: Row = serde_json::from_str(r#"{"cost": 30.4}"#).unwrap();
        assert_eq!(row.cost, dec!(30.4));

        let row: Row = serde_json::from_str(r#"{"cost": "$5.30"}"#).unwrap();
        assert_eq!(row.cost, dec!(5.30));

        assert!(serde_json::from_str::<Row>(r#"{"cost": true}"#).is_err());
    }

    #[test]
    fn test_serialization() {
        let m = Money::from_cents(1050);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "1050");

        let deserialized: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(m, deserialized);
    }
}
