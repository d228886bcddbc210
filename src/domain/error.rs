//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;
use uuid::Uuid;

/// Domain-specific errors
///
/// Business rule violations are not surfaced to callers as errors. A
/// settlement that hits one records it on the transaction as a `failed`
/// status, and the `Display` text of the variant becomes the stored reason.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Sender and receiver are the same user
    #[error("self-transfer not allowed")]
    SelfTransfer,

    /// Sender has not completed verification
    #[error("sender not verified")]
    SenderNotVerified,

    /// Receiver has not completed verification
    #[error("receiver not verified")]
    ReceiverNotVerified,

    /// Sender wallet cannot cover the amount
    #[error("insufficient funds")]
    InsufficientFunds { required: u64, available: u64 },

    /// Invalid amount (zero, negative, or exceeds limit)
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// User not found
    #[error("user not found: {0}")]
    UserNotFound(Uuid),

    /// Transaction not found
    #[error("transaction not found: {0}")]
    TransactionNotFound(Uuid),
}

impl DomainError {
    /// Create an insufficient funds error
    pub fn insufficient_funds(required: u64, available: u64) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }
}

impl From<super::AmountError> for DomainError {
    fn from(err: super::AmountError) -> Self {
        Self::InvalidAmount(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_strings() {
        assert_eq!(DomainError::SelfTransfer.to_string(), "self-transfer not allowed");
        assert_eq!(DomainError::SenderNotVerified.to_string(), "sender not verified");
        assert_eq!(DomainError::ReceiverNotVerified.to_string(), "receiver not verified");
        assert_eq!(
            DomainError::insufficient_funds(500, 10).to_string(),
            "insufficient funds"
        );
    }

    #[test]
    fn test_from_amount_error() {
        let err: DomainError = crate::domain::AmountError::NotPositive(0).into();
        assert!(matches!(err, DomainError::InvalidAmount(_)));
    }
}
