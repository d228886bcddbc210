//! User Verification Handler
//!
//! Runs the `user:verify` job.

use uuid::Uuid;

use crate::domain::DomainError;
use crate::jobs::{JobError, JobOutcome};
use crate::store::UserStoreRef;

/// Handler for verification jobs
#[derive(Clone)]
pub struct VerifyUserHandler {
    users: UserStoreRef,
}

impl VerifyUserHandler {
    pub fn new(users: UserStoreRef) -> Self {
        Self { users }
    }

    /// Verify the user as stored right now.
    ///
    /// A user that no longer exists drops the job.
    pub async fn execute(&self, user_id: Uuid) -> Result<JobOutcome, JobError> {
        match self.users.verify(user_id).await? {
            Some(outcome) => {
                tracing::info!(%user_id, ?outcome, "Verification applied");
                Ok(JobOutcome::UserVerified(outcome))
            }
            None => {
                tracing::warn!(
                    reason = %DomainError::UserNotFound(user_id),
                    "Dropping verification job"
                );
                Ok(JobOutcome::Dropped)
            }
        }
    }
}
