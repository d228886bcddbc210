//! Background Jobs
//!
//! Units of work handed from intake to the worker pool. A job carries only
//! the subject's id and what to do with it; workers re-read the subject when
//! they pick the job up, so the effect depends on state at processing time.

pub mod queue;
pub mod stats;
pub mod worker;

use std::fmt;

use async_trait::async_trait;
use uuid::Uuid;

use crate::aggregate::{TransactionStatus, VerificationOutcome};
use crate::store::StoreError;

pub use queue::{JobQueue, JobReceiver, JobSlot, QueueError};
pub use stats::{StatsSnapshot, WorkerStats};
pub use worker::{ShutdownReport, WorkerPool, WorkerPoolConfig};

// =========================================================================
// Job
// =========================================================================

/// What a job asks a worker to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobAction {
    VerifyUser,
    SettleTransaction,
}

impl JobAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobAction::VerifyUser => "user:verify",
            JobAction::SettleTransaction => "tx:complete",
        }
    }
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A queued unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    pub action: JobAction,
    pub subject_id: Uuid,
}

impl Job {
    pub fn verify_user(user_id: Uuid) -> Self {
        Self {
            action: JobAction::VerifyUser,
            subject_id: user_id,
        }
    }

    pub fn settle_transaction(tx_id: Uuid) -> Self {
        Self {
            action: JobAction::SettleTransaction,
            subject_id: tx_id,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.action, self.subject_id)
    }
}

// =========================================================================
// Processing contract
// =========================================================================

/// What processing a job amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    UserVerified(VerificationOutcome),
    TransactionSettled(TransactionStatus),
    /// Already terminal, or another worker is settling it
    Skipped,
    /// The subject, or a party it references, does not exist
    Dropped,
}

/// Executes a dequeued job against the stores
#[async_trait]
pub trait JobProcessor: Send + Sync + 'static {
    async fn process(&self, job: Job) -> Result<JobOutcome, JobError>;
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}
