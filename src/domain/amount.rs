//! Amount type
//!
//! Domain primitives for monetary values. Currency is fixed-point with two
//! decimal places; values that would need rounding are rejected, never
//! truncated.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum allowed single amount (1 trillion)
const MAX_AMOUNT: Decimal = Decimal::from_parts(3567587328, 232, 0, false, 0);

/// Currency scale (cents)
pub const CURRENCY_SCALE: u32 = 2;

/// Amount represents a validated, strictly positive monetary value.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - At most 2 decimal places
/// - Maximum value is 1 trillion
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use commerce_ledger::domain::Amount;
///
/// let amount: Amount = "300.50".parse().unwrap();
/// assert_eq!(amount.value(), Decimal::new(30050, 2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(Decimal);

/// Errors that can occur when creating an Amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("Amount has too many decimal places (max {CURRENCY_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Amount exceeds maximum allowed value ({MAX_AMOUNT})")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// Trailing zeros beyond the currency scale are accepted (`1.500`),
    /// significant digits beyond it are not (`1.505`).
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        let normalized = value.normalize();
        if normalized.scale() > CURRENCY_SCALE {
            return Err(AmountError::TooManyDecimals(normalized.scale()));
        }

        if value > MAX_AMOUNT {
            return Err(AmountError::Overflow);
        }

        Ok(Self(to_currency_scale(value)))
    }

    /// Get the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Multiply by a positive quantity (unit price x qty).
    pub fn checked_mul(&self, quantity: u32) -> Result<Amount, AmountError> {
        let total = self
            .0
            .checked_mul(Decimal::from(quantity))
            .ok_or(AmountError::Overflow)?;
        Amount::new(total)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal =
            Decimal::from_str(s.trim()).map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(decimal)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::from_str(&value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}

/// Balance represents an account balance (zero or positive).
///
/// Only single amounts are capped; a balance accumulates past `MAX_AMOUNT`
/// up to the NUMERIC(20,2) column range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Balance(Decimal);

impl Balance {
    /// Create a new balance (zero or positive)
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        Ok(Self(to_currency_scale(value)))
    }

    pub fn zero() -> Self {
        Self(to_currency_scale(Decimal::ZERO))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Check if balance covers the given amount
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}

/// Render a value with exactly two decimal places, as NUMERIC(20,2) stores it.
fn to_currency_scale(value: Decimal) -> Decimal {
    let mut scaled = value;
    scaled.rescale(CURRENCY_SCALE);
    scaled
}
