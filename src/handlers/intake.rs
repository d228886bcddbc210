//! Intake Service
//!
//! Accepts creation requests, writes the initial records and hands the rest
//! of the work to the job queue. Nothing here waits for a worker.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use super::{CreateTransactionCommand, CreateUserCommand};
use crate::aggregate::{Transaction, User, Wallet};
use crate::domain::Balance;
use crate::error::{AppError, AppResult};
use crate::jobs::{Job, JobQueue};
use crate::store::Stores;

/// A user as reported to callers, with the balance read at request time
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    pub balance: u64,
}

/// Front door of the engine
#[derive(Clone)]
pub struct IntakeService {
    stores: Stores,
    queue: JobQueue,
    starting_credit: Balance,
}

impl IntakeService {
    pub fn new(stores: Stores, queue: JobQueue, starting_credit: Balance) -> Self {
        Self {
            stores,
            queue,
            starting_credit,
        }
    }

    /// Register a user and queue their verification.
    ///
    /// The queue slot is taken before anything is written, so a user that
    /// becomes visible always has its verification job coming. The wallet is
    /// written before the user so that every visible user already has one.
    pub async fn create_user(&self, command: CreateUserCommand) -> AppResult<User> {
        let name = command.name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidRequest("name must not be empty".to_string()));
        }
        let slot = self.queue.reserve().await?;

        let user = User::create(Uuid::new_v4(), name.to_string(), command.skip_verification);
        let opening = if user.skip_verification() {
            Balance::zero()
        } else {
            self.starting_credit
        };

        self.stores.wallets.insert(Wallet::open(user.id(), opening)).await?;
        self.stores.users.insert(user.clone()).await?;
        slot.submit(Job::verify_user(user.id())).await;

        tracing::info!(
            user_id = %user.id(),
            skip_verification = user.skip_verification(),
            opening_balance = opening.value(),
            "User created"
        );
        Ok(user)
    }

    /// Record a pending transaction and queue its settlement.
    ///
    /// Parties are not checked here; the worker decides against the state it
    /// finds when the job runs.
    pub async fn create_transaction(
        &self,
        command: CreateTransactionCommand,
    ) -> AppResult<Transaction> {
        let slot = self.queue.reserve().await?;

        let tx = Transaction::pending(
            Uuid::new_v4(),
            command.sender_id,
            command.receiver_id,
            command.amount,
        );
        self.stores.transactions.insert(tx.clone()).await?;
        slot.submit(Job::settle_transaction(tx.id())).await;

        tracing::info!(
            transaction_id = %tx.id(),
            sender_id = %tx.sender_id(),
            receiver_id = %tx.receiver_id(),
            amount = tx.amount().value(),
            "Transaction accepted"
        );
        Ok(tx)
    }

    pub async fn list_users(&self) -> AppResult<Vec<UserView>> {
        let users = self.stores.users.list().await?;
        let balances: HashMap<Uuid, u64> = self
            .stores
            .wallets
            .snapshot()
            .await?
            .into_iter()
            .map(|w| (w.owner_id(), w.balance().value()))
            .collect();

        Ok(users
            .into_iter()
            .map(|user| {
                let balance = balances.get(&user.id()).copied().unwrap_or(0);
                UserView { user, balance }
            })
            .collect())
    }

    pub async fn get_user(&self, user_id: Uuid) -> AppResult<UserView> {
        let user = self
            .stores
            .users
            .get(user_id)
            .await?
            .ok_or(AppError::UserNotFound(user_id))?;
        let balance = self
            .stores
            .wallets
            .get(user_id)
            .await?
            .map(|w| w.balance().value())
            .unwrap_or(0);
        Ok(UserView { user, balance })
    }

    pub async fn list_transactions(&self) -> AppResult<Vec<Transaction>> {
        Ok(self.stores.transactions.list().await?)
    }

    pub async fn get_transaction(&self, tx_id: Uuid) -> AppResult<Transaction> {
        Ok(self
            .stores
            .transactions
            .get(tx_id)
            .await?
            .ok_or(AppError::TransactionNotFound(tx_id))?)
    }
}
