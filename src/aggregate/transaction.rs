//! Transaction Aggregate
//!
//! A transfer request between two users and its settlement lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::{Amount, DomainError};

use super::Aggregate;

/// Transaction lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of running settlement on a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Completed,
    Failed(DomainError),
}

impl SettlementOutcome {
    pub fn status(&self) -> TransactionStatus {
        match self {
            Self::Completed => TransactionStatus::Completed,
            Self::Failed(_) => TransactionStatus::Failed,
        }
    }
}

/// Transaction Aggregate
///
/// Created `pending` with an empty reason. Settlement writes the terminal
/// status and reason together, exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    amount: Amount,
    status: TransactionStatus,
    reason: String,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    settled_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Create a new pending transaction
    pub fn pending(id: Uuid, sender_id: Uuid, receiver_id: Uuid, amount: Amount) -> Self {
        Self {
            id,
            sender_id,
            receiver_id,
            amount,
            status: TransactionStatus::Pending,
            reason: String::new(),
            created_at: Utc::now(),
            settled_at: None,
        }
    }

    /// Record the settlement result.
    ///
    /// Returns `false` and leaves the record untouched if it is already
    /// terminal.
    pub fn settle(&mut self, outcome: &SettlementOutcome) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = outcome.status();
        self.reason = match outcome {
            SettlementOutcome::Completed => String::new(),
            SettlementOutcome::Failed(err) => err.to_string(),
        };
        self.settled_at = Some(Utc::now());
        true
    }

    pub fn is_self_transfer(&self) -> bool {
        self.sender_id == self.receiver_id
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sender_id(&self) -> Uuid {
        self.sender_id
    }

    pub fn receiver_id(&self) -> Uuid {
        self.receiver_id
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn settled_at(&self) -> Option<DateTime<Utc>> {
        self.settled_at
    }
}

impl Aggregate for Transaction {
    fn aggregate_type() -> &'static str {
        "Transaction"
    }

    fn key(&self) -> Uuid {
        self.id
    }
}
