//! Domain module
//!
//! Core domain types and business rules.

pub mod amount;
pub mod error;

pub use amount::{Amount, AmountError, Balance, MAX_AMOUNT};
pub use error::DomainError;
