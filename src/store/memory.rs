//! In-memory store implementations
//!
//! State lives for the lifetime of the process only.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::aggregate::{
    Aggregate, SettlementOutcome, Transaction, User, VerificationOutcome, Wallet,
};
use crate::domain::{Amount, DomainError};

use super::{
    Claim, StoreError, StoreResult, TransactionStore, TransferReceipt, UserStore, WalletStore,
};

fn not_found<A: Aggregate>(id: Uuid) -> StoreError {
    StoreError::NotFound {
        aggregate: A::aggregate_type(),
        id,
    }
}

fn duplicate<A: Aggregate>(id: Uuid) -> StoreError {
    StoreError::Duplicate {
        aggregate: A::aggregate_type(),
        id,
    }
}

// =========================================================================
// Users
// =========================================================================

/// A thread-safe in-memory account registry.
///
/// One `RwLock` guards the whole map, so a reader never sees a user with
/// `is_verified` half-updated.
#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.key()) {
            return Err(duplicate::<User>(user.key()));
        }
        users.insert(user.key(), user);
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&user_id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let users = self.users.read().await;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by_key(|u| u.created_at());
        Ok(all)
    }

    async fn verify(&self, user_id: Uuid) -> StoreResult<Option<VerificationOutcome>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&user_id).map(User::verify))
    }
}

// =========================================================================
// Wallets
// =========================================================================

/// A thread-safe in-memory wallet store.
///
/// Every wallet sits behind its own `Mutex`. Transfers hold the map's read
/// lock plus both wallet mutexes; snapshots take the map's write lock, which
/// waits out every transfer in progress.
#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    wallets: Arc<RwLock<HashMap<Uuid, Arc<Mutex<Wallet>>>>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn insert(&self, wallet: Wallet) -> StoreResult<()> {
        let mut wallets = self.wallets.write().await;
        if wallets.contains_key(&wallet.key()) {
            return Err(duplicate::<Wallet>(wallet.key()));
        }
        wallets.insert(wallet.key(), Arc::new(Mutex::new(wallet)));
        Ok(())
    }

    async fn get(&self, owner_id: Uuid) -> StoreResult<Option<Wallet>> {
        let wallets = self.wallets.read().await;
        match wallets.get(&owner_id) {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn snapshot(&self) -> StoreResult<Vec<Wallet>> {
        let wallets = self.wallets.write().await;
        let mut all = Vec::with_capacity(wallets.len());
        for slot in wallets.values() {
            all.push(slot.lock().await.clone());
        }
        all.sort_by_key(|w| w.created_at());
        Ok(all)
    }

    async fn transfer(
        &self,
        sender: Uuid,
        receiver: Uuid,
        amount: Amount,
    ) -> StoreResult<TransferReceipt> {
        // Locking the same mutex twice would deadlock
        if sender == receiver {
            return Err(DomainError::SelfTransfer.into());
        }

        let wallets = self.wallets.read().await;
        let sender_slot = wallets
            .get(&sender)
            .cloned()
            .ok_or_else(|| not_found::<Wallet>(sender))?;
        let receiver_slot = wallets
            .get(&receiver)
            .cloned()
            .ok_or_else(|| not_found::<Wallet>(receiver))?;

        // Global lock order: lower owner id first
        let sender_first = sender < receiver;
        let (first, second) = if sender_first {
            (&sender_slot, &receiver_slot)
        } else {
            (&receiver_slot, &sender_slot)
        };
        let first_guard = first.lock().await;
        let second_guard = second.lock().await;
        let (mut from, mut to) = if sender_first {
            (first_guard, second_guard)
        } else {
            (second_guard, first_guard)
        };

        // Stage both legs before writing either
        let mut debited = from.clone();
        debited.debit(&amount)?;
        let mut credited = to.clone();
        credited.credit(&amount)?;

        *from = debited;
        *to = credited;

        Ok(TransferReceipt {
            sender_balance: from.balance().value(),
            receiver_balance: to.balance().value(),
        })
    }
}

// =========================================================================
// Transactions
// =========================================================================

#[derive(Default)]
struct Ledger {
    transactions: HashMap<Uuid, Transaction>,
    in_flight: HashSet<Uuid>,
}

/// A thread-safe in-memory transaction ledger.
///
/// Claims are tracked next to the records, under the same lock, so two
/// workers holding duplicate jobs for one transaction cannot both settle it.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    ledger: Arc<RwLock<Ledger>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert(&self, tx: Transaction) -> StoreResult<()> {
        let mut ledger = self.ledger.write().await;
        if ledger.transactions.contains_key(&tx.key()) {
            return Err(duplicate::<Transaction>(tx.key()));
        }
        ledger.transactions.insert(tx.key(), tx);
        Ok(())
    }

    async fn get(&self, tx_id: Uuid) -> StoreResult<Option<Transaction>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.transactions.get(&tx_id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<Transaction>> {
        let ledger = self.ledger.read().await;
        let mut all: Vec<Transaction> = ledger.transactions.values().cloned().collect();
        all.sort_by_key(|t| t.created_at());
        Ok(all)
    }

    async fn claim(&self, tx_id: Uuid) -> StoreResult<Claim> {
        let mut ledger = self.ledger.write().await;
        let tx = match ledger.transactions.get(&tx_id) {
            Some(tx) => tx.clone(),
            None => return Ok(Claim::NotFound),
        };

        if tx.status().is_terminal() {
            return Ok(Claim::AlreadySettled(tx));
        }
        if !ledger.in_flight.insert(tx_id) {
            return Ok(Claim::InFlight);
        }
        Ok(Claim::Claimed(tx))
    }

    async fn release(&self, tx_id: Uuid) -> StoreResult<()> {
        let mut ledger = self.ledger.write().await;
        ledger.in_flight.remove(&tx_id);
        Ok(())
    }

    async fn finalize(
        &self,
        tx_id: Uuid,
        outcome: SettlementOutcome,
    ) -> StoreResult<Option<Transaction>> {
        let mut ledger = self.ledger.write().await;
        ledger.in_flight.remove(&tx_id);

        let tx = ledger
            .transactions
            .get_mut(&tx_id)
            .ok_or_else(|| not_found::<Transaction>(tx_id))?;

        if tx.settle(&outcome) {
            Ok(Some(tx.clone()))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::TransactionStatus;
    use crate::domain::{Balance, MAX_AMOUNT};

    async fn wallets_with(balances: &[u64]) -> (InMemoryWalletStore, Vec<Uuid>) {
        let store = InMemoryWalletStore::new();
        let mut owners = Vec::new();
        for balance in balances {
            let owner = Uuid::new_v4();
            store
                .insert(Wallet::open(owner, Balance::new(*balance)))
                .await
                .unwrap();
            owners.push(owner);
        }
        (store, owners)
    }

    #[tokio::test]
    async fn test_user_store_insert_and_verify() {
        let store = InMemoryUserStore::new();
        let user = User::create(Uuid::new_v4(), "alice".to_string(), false);
        let id = user.id();

        store.insert(user.clone()).await.unwrap();
        assert!(matches!(
            store.insert(user).await,
            Err(StoreError::Duplicate { aggregate: "User", .. })
        ));

        assert_eq!(
            store.verify(id).await.unwrap(),
            Some(VerificationOutcome::Verified)
        );
        assert!(store.get(id).await.unwrap().unwrap().is_verified());
        assert_eq!(store.verify(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_wallet_transfer_moves_funds() {
        let (store, owners) = wallets_with(&[2000, 2000]).await;
        let receipt = store
            .transfer(owners[0], owners[1], Amount::new(500).unwrap())
            .await
            .unwrap();

        assert_eq!(receipt.sender_balance, 1500);
        assert_eq!(receipt.receiver_balance, 2500);
        assert_eq!(store.get(owners[0]).await.unwrap().unwrap().balance().value(), 1500);
    }

    #[tokio::test]
    async fn test_wallet_transfer_can_exceed_max_amount_balance() {
        let (store, owners) = wallets_with(&[MAX_AMOUNT, MAX_AMOUNT]).await;
        let receipt = store
            .transfer(owners[0], owners[1], Amount::new(MAX_AMOUNT as i64).unwrap())
            .await
            .unwrap();

        assert_eq!(receipt.sender_balance, 0);
        assert_eq!(receipt.receiver_balance, 2 * MAX_AMOUNT);
    }

    #[tokio::test]
    async fn test_wallet_transfer_insufficient_leaves_both_untouched() {
        let (store, owners) = wallets_with(&[100, 0]).await;
        let result = store
            .transfer(owners[0], owners[1], Amount::new(101).unwrap())
            .await;

        assert!(matches!(
            result,
            Err(StoreError::Rejected(DomainError::InsufficientFunds { .. }))
        ));
        let snapshot = store.snapshot().await.unwrap();
        let total: u64 = snapshot.iter().map(|w| w.balance().value()).sum();
        assert_eq!(total, 100);
    }

    #[tokio::test]
    async fn test_wallet_transfer_to_self_rejected() {
        let (store, owners) = wallets_with(&[100]).await;
        let result = store
            .transfer(owners[0], owners[0], Amount::new(1).unwrap())
            .await;
        assert!(matches!(
            result,
            Err(StoreError::Rejected(DomainError::SelfTransfer))
        ));
    }

    #[tokio::test]
    async fn test_wallet_transfer_missing_wallet() {
        let (store, owners) = wallets_with(&[100]).await;
        let result = store
            .transfer(owners[0], Uuid::new_v4(), Amount::new(1).unwrap())
            .await;
        assert!(matches!(
            result,
            Err(StoreError::NotFound { aggregate: "Wallet", .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_crossing_transfers_do_not_deadlock() {
        let (store, owners) = wallets_with(&[10_000, 10_000]).await;
        let (a, b) = (owners[0], owners[1]);

        let mut handles = Vec::new();
        for i in 0..200 {
            let store = store.clone();
            let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
            handles.push(tokio::spawn(async move {
                store.transfer(from, to, Amount::new(7).unwrap()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let snapshot = store.snapshot().await.unwrap();
        let total: u64 = snapshot.iter().map(|w| w.balance().value()).sum();
        assert_eq!(total, 20_000);
        assert_eq!(store.get(a).await.unwrap().unwrap().balance().value(), 10_000);
    }

    #[tokio::test]
    async fn test_transaction_claim_lifecycle() {
        let store = InMemoryTransactionStore::new();
        let tx = Transaction::pending(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Amount::new(5).unwrap(),
        );
        let id = tx.id();
        store.insert(tx).await.unwrap();

        assert!(matches!(store.claim(id).await.unwrap(), Claim::Claimed(_)));
        assert_eq!(store.claim(id).await.unwrap(), Claim::InFlight);

        let settled = store
            .finalize(id, SettlementOutcome::Completed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(settled.status(), TransactionStatus::Completed);

        assert!(matches!(
            store.claim(id).await.unwrap(),
            Claim::AlreadySettled(_)
        ));
        assert!(store
            .finalize(id, SettlementOutcome::Failed(DomainError::SelfTransfer))
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.claim(Uuid::new_v4()).await.unwrap(), Claim::NotFound);
    }

    #[tokio::test]
    async fn test_transaction_release_allows_reclaim() {
        let store = InMemoryTransactionStore::new();
        let tx = Transaction::pending(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Amount::new(5).unwrap(),
        );
        let id = tx.id();
        store.insert(tx).await.unwrap();

        assert!(matches!(store.claim(id).await.unwrap(), Claim::Claimed(_)));
        store.release(id).await.unwrap();
        assert!(matches!(store.claim(id).await.unwrap(), Claim::Claimed(_)));
        assert_eq!(
            store.get(id).await.unwrap().unwrap().status(),
            TransactionStatus::Pending
        );
    }
}
