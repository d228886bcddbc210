//! Settlement Handler
//!
//! Runs the `tx:complete` job: validates both parties and moves funds
//! between their wallets, then records the terminal status exactly once.

use uuid::Uuid;

use crate::aggregate::{SettlementOutcome, Transaction};
use crate::domain::DomainError;
use crate::jobs::{JobError, JobOutcome};
use crate::store::{Claim, StoreError, TransactionStoreRef, UserStoreRef, WalletStoreRef};

/// Handler for settlement jobs
#[derive(Clone)]
pub struct SettlementHandler {
    users: UserStoreRef,
    wallets: WalletStoreRef,
    transactions: TransactionStoreRef,
}

impl SettlementHandler {
    pub fn new(
        users: UserStoreRef,
        wallets: WalletStoreRef,
        transactions: TransactionStoreRef,
    ) -> Self {
        Self {
            users,
            wallets,
            transactions,
        }
    }

    /// Settle the transaction as stored right now.
    pub async fn execute(&self, tx_id: Uuid) -> Result<JobOutcome, JobError> {
        let tx = match self.transactions.claim(tx_id).await? {
            Claim::Claimed(tx) => tx,
            Claim::NotFound => {
                tracing::warn!(
                    reason = %DomainError::TransactionNotFound(tx_id),
                    "Dropping settlement job"
                );
                return Ok(JobOutcome::Dropped);
            }
            Claim::InFlight => {
                tracing::info!(transaction_id = %tx_id, "Transaction is being settled by another worker");
                return Ok(JobOutcome::Skipped);
            }
            Claim::AlreadySettled(tx) => {
                tracing::info!(
                    transaction_id = %tx_id,
                    status = %tx.status(),
                    "Transaction already settled"
                );
                return Ok(JobOutcome::Skipped);
            }
        };

        let outcome = match self.settle(&tx).await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => {
                self.transactions.release(tx_id).await?;
                return Ok(JobOutcome::Dropped);
            }
            Err(e) => {
                self.transactions.release(tx_id).await?;
                return Err(e);
            }
        };

        match self.transactions.finalize(tx_id, outcome).await? {
            Some(settled) => {
                tracing::info!(
                    transaction_id = %tx_id,
                    status = %settled.status(),
                    reason = settled.reason(),
                    "Transaction settled"
                );
                Ok(JobOutcome::TransactionSettled(settled.status()))
            }
            None => Ok(JobOutcome::Skipped),
        }
    }

    /// Decide the outcome, moving funds if every check passes.
    ///
    /// `None` means a party no longer exists and the job should be dropped
    /// with the transaction left pending.
    async fn settle(&self, tx: &Transaction) -> Result<Option<SettlementOutcome>, JobError> {
        let failed = |err: DomainError| Ok(Some(SettlementOutcome::Failed(err)));

        if tx.is_self_transfer() {
            return failed(DomainError::SelfTransfer);
        }

        let Some(sender) = self.users.get(tx.sender_id()).await? else {
            tracing::warn!(
                transaction_id = %tx.id(),
                reason = %DomainError::UserNotFound(tx.sender_id()),
                "Dropping settlement job: sender missing"
            );
            return Ok(None);
        };
        if !sender.is_verified() {
            return failed(DomainError::SenderNotVerified);
        }

        let Some(receiver) = self.users.get(tx.receiver_id()).await? else {
            tracing::warn!(
                transaction_id = %tx.id(),
                reason = %DomainError::UserNotFound(tx.receiver_id()),
                "Dropping settlement job: receiver missing"
            );
            return Ok(None);
        };
        if !receiver.is_verified() {
            return failed(DomainError::ReceiverNotVerified);
        }

        match self
            .wallets
            .transfer(sender.id(), receiver.id(), tx.amount())
            .await
        {
            Ok(receipt) => {
                tracing::debug!(
                    transaction_id = %tx.id(),
                    sender_balance = receipt.sender_balance,
                    receiver_balance = receipt.receiver_balance,
                    "Funds moved"
                );
                Ok(Some(SettlementOutcome::Completed))
            }
            Err(StoreError::Rejected(err)) => failed(err),
            Err(StoreError::NotFound { aggregate, id }) => {
                tracing::warn!(
                    transaction_id = %tx.id(),
                    %aggregate,
                    %id,
                    "Dropping settlement job: wallet missing"
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
