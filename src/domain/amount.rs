//! Amount type
//!
//! Domain primitives for monetary values. Money is counted in whole units,
//! so both types wrap an unsigned integer. All amounts are validated at
//! construction time, ensuring invalid values cannot exist in the system.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum allowed transfer amount (1 trillion units)
pub const MAX_AMOUNT: u64 = 1_000_000_000_000;

/// Amount represents a validated transfer value.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Maximum value is 1 trillion units
///
/// # Example
/// ```
/// use wallet_settle::domain::Amount;
///
/// let amount = Amount::new(500).unwrap();
/// assert_eq!(amount.value(), 500);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u64")]
pub struct Amount(u64);

/// Errors that can occur when creating an Amount or Balance
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(i64),

    #[error("Amount exceeds maximum allowed value ({MAX_AMOUNT})")]
    Overflow,

    #[error("Balance cannot go below zero (short by {0})")]
    Underflow(u64),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    /// - `AmountError::Overflow` if value > 1 trillion
    pub fn new(value: i64) -> Result<Self, AmountError> {
        if value <= 0 {
            return Err(AmountError::NotPositive(value));
        }

        let value = value as u64;
        if value > MAX_AMOUNT {
            return Err(AmountError::Overflow);
        }

        Ok(Self(value))
    }

    /// Get the underlying value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Amount {
    type Error = AmountError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for u64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Balance represents a wallet balance (can be zero or positive).
/// Unlike Amount, Balance can be zero, and it can never go negative.
/// It has no upper cap beyond `u64`: a wallet may accumulate more than any
/// single transfer can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(u64);

impl Balance {
    /// Create a new balance
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Create a zero balance
    pub fn zero() -> Self {
        Self(0)
    }

    /// Get the underlying value
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Check if balance is sufficient for withdrawal
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Add amount to balance
    pub fn credit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        self.0
            .checked_add(amount.value())
            .map(Balance)
            .ok_or(AmountError::Overflow)
    }

    /// Subtract amount from balance
    pub fn debit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        self.0
            .checked_sub(amount.value())
            .map(Balance)
            .ok_or_else(|| AmountError::Underflow(amount.value().saturating_sub(self.0)))
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
