//! Monetary value objects.
//!
//! Balances are decimals with a fixed scale of [`MONEY_SCALE`] fractional digits.
//! `Money` is never negative; `Amount` is strictly positive and is the only thing a
//! balance can be credited or debited with.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Number of fractional digits every balance is stored with.
pub const MONEY_SCALE: u32 = 2;

/// Non-negative monetary value (an account balance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

/// Strictly positive monetary value (the operand of credit/debit/transfer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

fn normalize(value: Decimal) -> DomainResult<Decimal> {
    let trimmed = value.normalize();
    if trimmed.scale() > MONEY_SCALE {
        return Err(DomainError::validation(format!(
            "{value} has more than {MONEY_SCALE} fractional digits"
        )));
    }
    let mut scaled = trimmed;
    scaled.rescale(MONEY_SCALE);
    // rescale rounds instead of failing once the mantissa is full
    if scaled.scale() != MONEY_SCALE {
        return Err(DomainError::validation(format!(
            "{value} is too large to hold {MONEY_SCALE} fractional digits"
        )));
    }
    Ok(scaled)
}

/// Keeps only results that still carry the full scale; `Decimal` arithmetic
/// silently drops fractional digits near its maximum.
fn exact(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| v.scale() == MONEY_SCALE)
}

impl Money {
    pub fn zero() -> Self {
        let mut zero = Decimal::ZERO;
        zero.rescale(MONEY_SCALE);
        Self(zero)
    }

    pub fn try_from_decimal(value: Decimal) -> DomainResult<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(DomainError::invariant(format!("balance cannot be negative: {value}")));
        }
        Ok(Self(normalize(value)?))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Whether this balance covers `amount` without going negative.
    pub fn covers(&self, amount: Amount) -> bool {
        self.0 >= amount.0
    }

    /// `None` when the sum no longer fits at the fixed scale.
    pub fn checked_add(&self, amount: Amount) -> Option<Self> {
        exact(self.0.checked_add(amount.0)).map(Self)
    }

    /// `None` when the result would be negative or lose precision.
    pub fn checked_sub(&self, amount: Amount) -> Option<Self> {
        if !self.covers(amount) {
            return None;
        }
        exact(self.0.checked_sub(amount.0)).map(Self)
    }
}

impl Amount {
    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value <= Decimal::ZERO {
            return Err(DomainError::validation(format!("amount must be positive, got {value}")));
        }
        Ok(Self(normalize(value)?))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_from_decimal(value)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl From<Amount> for Decimal {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl ValueObject for Money {}
impl ValueObject for Amount {}
