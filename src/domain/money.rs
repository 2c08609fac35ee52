use crate::error::MallError;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, de};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

/// Prepaid funds held by a user.
///
/// Wraps `rust_decimal::Decimal` so that the only way to shrink a balance is
/// [`Balance::checked_sub`], which refuses to go below zero. Persisted as a
/// plain JSON number; reading a negative number back is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub struct Balance(#[serde(serialize_with = "rust_decimal::serde::float::serialize")] Decimal);

impl<'de> Deserialize<'de> for Balance {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = rust_decimal::serde::float::deserialize(deserializer)?;
        Self::new(value).map_err(de::Error::custom)
    }
}

/// A strictly positive amount used for top-ups and exit charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, MallError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(MallError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = MallError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl FromStr for Amount {
    type Err = MallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| MallError::ValidationError(format!("Invalid amount '{s}': {e}")))?;
        Self::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Builds a balance, refusing negative values.
    pub fn new(amount: Decimal) -> Result<Self, MallError> {
        if amount >= Decimal::ZERO {
            Ok(Self(amount))
        } else {
            Err(MallError::ValidationError(
                "Balance cannot be negative".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Subtracts `amount`, or returns `None` if that would leave the balance negative.
    pub fn checked_sub(self, amount: Amount) -> Option<Self> {
        if self.0 >= amount.0 {
            Some(Self(self.0 - amount.0))
        } else {
            None
        }
    }
}

impl Add<Amount> for Balance {
    type Output = Self;
    fn add(self, rhs: Amount) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}
