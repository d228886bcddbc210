//! Store module
//!
//! Storage ports for the three stores the engine owns. Settlement and intake
//! only talk to these traits, so a persistent backend can replace the
//! in-memory one without touching the job handlers.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::aggregate::{SettlementOutcome, Transaction, User, VerificationOutcome, Wallet};
use crate::domain::{Amount, DomainError};

pub use memory::{InMemoryTransactionStore, InMemoryUserStore, InMemoryWalletStore};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{aggregate} already exists: {id}")]
    Duplicate { aggregate: &'static str, id: Uuid },

    #[error("{aggregate} not found: {id}")]
    NotFound { aggregate: &'static str, id: Uuid },

    /// A business rule rejected the mutation; nothing was written
    #[error(transparent)]
    Rejected(#[from] DomainError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of trying to take a transaction for settlement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// The caller now owns settlement of this pending transaction
    Claimed(Transaction),
    /// Another worker is settling it right now
    InFlight,
    /// It already reached a terminal status
    AlreadySettled(Transaction),
    NotFound,
}

/// Balances of both wallets right after a transfer was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub sender_balance: u64,
    pub receiver_balance: u64,
}

/// Account registry: owns users and their verification state
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: User) -> StoreResult<()>;
    async fn get(&self, user_id: Uuid) -> StoreResult<Option<User>>;
    async fn list(&self) -> StoreResult<Vec<User>>;

    /// Apply the verification transition in place.
    ///
    /// Returns `None` if the user does not exist.
    async fn verify(&self, user_id: Uuid) -> StoreResult<Option<VerificationOutcome>>;
}

/// Wallet store: owns one balance per user
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn insert(&self, wallet: Wallet) -> StoreResult<()>;
    async fn get(&self, owner_id: Uuid) -> StoreResult<Option<Wallet>>;

    /// Point-in-time copy of every wallet.
    ///
    /// No transfer is half-applied in the returned set.
    async fn snapshot(&self) -> StoreResult<Vec<Wallet>>;

    /// Move `amount` from `sender`'s wallet to `receiver`'s wallet.
    ///
    /// Implementations take exclusive access to both wallets in a fixed
    /// global order, and either apply both legs or neither. Business rule
    /// failures come back as `StoreError::Rejected`.
    async fn transfer(
        &self,
        sender: Uuid,
        receiver: Uuid,
        amount: Amount,
    ) -> StoreResult<TransferReceipt>;
}

/// Transaction ledger: owns transfer requests and their lifecycle
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert(&self, tx: Transaction) -> StoreResult<()>;
    async fn get(&self, tx_id: Uuid) -> StoreResult<Option<Transaction>>;
    async fn list(&self) -> StoreResult<Vec<Transaction>>;

    /// Take exclusive ownership of a pending transaction's settlement.
    async fn claim(&self, tx_id: Uuid) -> StoreResult<Claim>;

    /// Give a claim back without settling (the subject's parties vanished).
    async fn release(&self, tx_id: Uuid) -> StoreResult<()>;

    /// Write the terminal status and reason, and drop the claim.
    ///
    /// Returns the stored record, or `None` if it was already terminal.
    async fn finalize(
        &self,
        tx_id: Uuid,
        outcome: SettlementOutcome,
    ) -> StoreResult<Option<Transaction>>;
}

pub type UserStoreRef = Arc<dyn UserStore>;
pub type WalletStoreRef = Arc<dyn WalletStore>;
pub type TransactionStoreRef = Arc<dyn TransactionStore>;

/// The three stores the engine works against
#[derive(Clone)]
pub struct Stores {
    pub users: UserStoreRef,
    pub wallets: WalletStoreRef,
    pub transactions: TransactionStoreRef,
}

impl Stores {
    /// Fresh, empty in-memory stores
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserStore::new()),
            wallets: Arc::new(InMemoryWalletStore::new()),
            transactions: Arc::new(InMemoryTransactionStore::new()),
        }
    }
}
