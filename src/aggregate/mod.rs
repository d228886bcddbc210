//! Aggregate module
//!
//! The three entities the settlement engine mutates. Each one is owned by
//! exactly one store and only ever changes through the methods defined here.

pub mod transaction;
pub mod user;
pub mod wallet;

pub use transaction::{SettlementOutcome, Transaction, TransactionStatus};
pub use user::{User, VerificationOutcome};
pub use wallet::Wallet;

/// Aggregate trait that all stored entities implement
pub trait Aggregate: Clone + Send + Sync + 'static {
    /// Get the aggregate type name (for logs and storage errors)
    fn aggregate_type() -> &'static str;

    /// Get the key the owning store indexes this aggregate by
    fn key(&self) -> uuid::Uuid;
}
