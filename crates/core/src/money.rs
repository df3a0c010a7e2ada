use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("No digits in cost text: '{0}'")]
    Empty(String),
    #[error("Invalid cost text '{0}': {1}")]
    Invalid(String, String),
}

/// A dollar amount as printed on a bill, kept at full decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Parse the raw text of a matched cost (`$1,234.56`, `99`, ...).
    /// The currency symbol and thousands separators are dropped.
    pub fn parse_cost(text: &str) -> Result<Self, MoneyError> {
        let clean: String = text
            .trim()
            .chars()
            .filter(|c| *c != '$' && *c != ',')
            .collect();
        if clean.is_empty() {
            return Err(MoneyError::Empty(text.to_string()));
        }
        Decimal::from_str(&clean)
            .map(Money::from_decimal)
            .map_err(|e| MoneyError::Invalid(text.to_string(), e.to_string()))
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl std::ops::Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}
