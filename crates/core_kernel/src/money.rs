//! Money types with fixed-point minor-unit arithmetic
//!
//! Every monetary value in the system is an integer number of minor units
//! (cents). Rates and percentages are `rust_decimal::Decimal` values, and a
//! product of money and a rate is rounded exactly once, at the boundary,
//! back to a whole minor unit. No floating point is used anywhere.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Currency codes following ISO 4217
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    CAD,
    USD,
    EUR,
    GBP,
    AUD,
    JPY,
}

impl Currency {
    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::CAD => "C$",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::AUD => "A$",
            Currency::JPY => "¥",
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::CAD => "CAD",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::AUD => "AUD",
            Currency::JPY => "JPY",
        }
    }

    fn minor_factor(&self) -> Decimal {
        Decimal::from(10_i64.pow(self.decimal_places()))
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::CAD
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CAD" => Ok(Currency::CAD),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "AUD" => Ok(Currency::AUD),
            "JPY" => Ok(Currency::JPY),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Overflow during calculation")]
    Overflow,
}

/// A monetary amount held as whole minor units with its currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    cents: i64,
    currency: Currency,
}

impl Money {
    /// Creates Money from an integer amount in minor units (cents)
    pub fn from_cents(cents: i64, currency: Currency) -> Self {
        Self { cents, currency }
    }

    /// Creates Money from a major-unit decimal amount (e.g. dollars)
    ///
    /// The amount must be representable exactly in minor units; `12.345`
    /// dollars is rejected instead of being silently rounded.
    pub fn from_major(amount: Decimal, currency: Currency) -> Result<Self, MoneyError> {
        let scaled = amount
            .checked_mul(currency.minor_factor())
            .ok_or(MoneyError::Overflow)?;
        if scaled.fract() != Decimal::ZERO {
            return Err(MoneyError::InvalidAmount(format!(
                "{} has more than {} decimal places",
                amount,
                currency.decimal_places()
            )));
        }
        let cents = scaled.to_i64().ok_or(MoneyError::Overflow)?;
        Ok(Self::from_cents(cents, currency))
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self { cents: 0, currency }
    }

    /// Returns the amount in minor units
    pub fn to_cents(&self) -> i64 {
        self.cents
    }

    /// Returns the amount in major units (e.g. dollars)
    pub fn to_major(&self) -> Decimal {
        Decimal::new(self.cents, self.currency.decimal_places())
    }

    /// Returns the currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Checked addition that returns an error on currency mismatch or overflow
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        let cents = self.cents.checked_add(other.cents).ok_or(MoneyError::Overflow)?;
        Ok(Self::from_cents(cents, self.currency))
    }

    /// Checked subtraction that returns an error on currency mismatch or overflow
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        let cents = self.cents.checked_sub(other.cents).ok_or(MoneyError::Overflow)?;
        Ok(Self::from_cents(cents, self.currency))
    }

    /// Multiplies by a whole quantity without any rounding
    pub fn times(&self, quantity: i64) -> Result<Money, MoneyError> {
        let cents = self.cents.checked_mul(quantity).ok_or(MoneyError::Overflow)?;
        Ok(Self::from_cents(cents, self.currency))
    }

    /// Multiplies by a decimal factor, rounding once to the nearest minor unit
    ///
    /// Midpoints round away from zero, so `$0.05 × 0.5` is `$0.03`.
    pub fn multiply(&self, factor: Decimal) -> Result<Money, MoneyError> {
        let product = Decimal::from(self.cents)
            .checked_mul(factor)
            .ok_or(MoneyError::Overflow)?;
        let cents = product
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::from_cents(cents, self.currency))
    }

    /// Returns `percentage`% of this amount, rounded once
    pub fn percentage(&self, percentage: Decimal) -> Result<Money, MoneyError> {
        self.multiply(percentage / dec!(100))
    }

    /// Returns the smaller of two amounts in the same currency
    pub fn min(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(if self.cents <= other.cents { *self } else { *other })
    }

    /// Sums an iterator of amounts, failing on mismatch or overflow
    pub fn sum<'a, I>(amounts: I, currency: Currency) -> Result<Money, MoneyError>
    where
        I: IntoIterator<Item = &'a Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.checked_add(m))
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dp = self.currency.decimal_places();
        write!(
            f,
            "{} {:.dp$}",
            self.currency.symbol(),
            self.to_major(),
            dp = dp as usize
        )
    }
}

/// Converts a dollar amount (template storage column) to cents
///
/// Lossless: amounts with sub-cent precision are rejected.
pub fn dollars_to_cents(dollars: Decimal) -> Result<i64, MoneyError> {
    let scaled = dollars.checked_mul(dec!(100)).ok_or(MoneyError::Overflow)?;
    if scaled.fract() != Decimal::ZERO {
        return Err(MoneyError::InvalidAmount(format!(
            "{} is not a whole number of cents",
            dollars
        )));
    }
    scaled.to_i64().ok_or(MoneyError::Overflow)
}

/// Converts cents to a dollar amount with exactly two decimal places
pub fn cents_to_dollars(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// A rate held as a fraction (e.g. `0.07` for 7%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate {
    value: Decimal,
}

impl Rate {
    /// Creates a rate from a fraction (e.g. 0.05 for 5%)
    pub fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// Creates a rate from a percentage (e.g. 5 for 5%)
    pub fn from_percentage(percentage: Decimal) -> Self {
        Self {
            value: percentage / dec!(100),
        }
    }

    pub fn as_decimal(&self) -> Decimal {
        self.value
    }

    pub fn as_percentage(&self) -> Decimal {
        self.value * dec!(100)
    }

    /// True when the fraction lies within `[0, 1]`
    pub fn is_valid_fraction(&self) -> bool {
        self.value >= Decimal::ZERO && self.value <= Decimal::ONE
    }

    /// Applies this rate to a money amount, rounding once
    pub fn apply(&self, money: &Money) -> Result<Money, MoneyError> {
        money.multiply(self.value)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_cents() {
        let m = Money::from_cents(10050, Currency::CAD);
        assert_eq!(m.to_major(), dec!(100.50));
        assert_eq!(m.to_cents(), 10050);
    }

    #[test]
    fn test_money_from_major_rejects_sub_cent() {
        let result = Money::from_major(dec!(1.005), Currency::CAD);
        assert!(matches!(result, Err(MoneyError::InvalidAmount(_))));
    }

    #[test]
    fn test_huge_amounts_overflow_instead_of_panicking() {
        assert_eq!(dollars_to_cents(Decimal::MAX), Err(MoneyError::Overflow));
        assert_eq!(dollars_to_cents(Decimal::MIN), Err(MoneyError::Overflow));
        assert_eq!(
            Money::from_major(Decimal::MAX, Currency::CAD),
            Err(MoneyError::Overflow)
        );
    }

    #[test]
    fn test_multiply_rounds_half_away_from_zero() {
        let m = Money::from_cents(5, Currency::CAD);
        assert_eq!(m.multiply(dec!(0.5)).unwrap().to_cents(), 3);

        let negative = Money::from_cents(-5, Currency::CAD);
        assert_eq!(negative.multiply(dec!(0.5)).unwrap().to_cents(), -3);
    }

    #[test]
    fn test_currency_mismatch() {
        let cad = Money::from_cents(100, Currency::CAD);
        let usd = Money::from_cents(100, Currency::USD);

        let result = cad.checked_add(&usd);
        assert!(matches!(result, Err(MoneyError::CurrencyMismatch(_, _))));
    }

    #[test]
    fn test_rate_application() {
        let rate = Rate::new(dec!(0.07));
        let amount = Money::from_cents(10000, Currency::CAD);

        assert_eq!(rate.apply(&amount).unwrap().to_cents(), 700);
    }

    #[test]
    fn test_display() {
        let m = Money::from_cents(9450, Currency::CAD);
        assert_eq!(m.to_string(), "C$ 94.50");
    }
}
