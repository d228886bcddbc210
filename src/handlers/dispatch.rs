//! Job dispatch: routes each dequeued job to its handler by action.

use async_trait::async_trait;

use super::{SettlementHandler, VerifyUserHandler};
use crate::jobs::{Job, JobAction, JobError, JobOutcome, JobProcessor};
use crate::store::Stores;

/// The processor the worker pool runs against
#[derive(Clone)]
pub struct JobDispatcher {
    verify: VerifyUserHandler,
    settle: SettlementHandler,
}

impl JobDispatcher {
    pub fn new(stores: &Stores) -> Self {
        Self {
            verify: VerifyUserHandler::new(stores.users.clone()),
            settle: SettlementHandler::new(
                stores.users.clone(),
                stores.wallets.clone(),
                stores.transactions.clone(),
            ),
        }
    }
}

#[async_trait]
impl JobProcessor for JobDispatcher {
    async fn process(&self, job: Job) -> Result<JobOutcome, JobError> {
        match job.action {
            JobAction::VerifyUser => self.verify.execute(job.subject_id).await,
            JobAction::SettleTransaction => self.settle.execute(job.subject_id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{User, VerificationOutcome};
    use crate::store::UserStore;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_dispatch_by_action() {
        let stores = Stores::in_memory();
        let user = User::create(Uuid::new_v4(), "alice".to_string(), false);
        let id = user.id();
        stores.users.insert(user).await.unwrap();

        let dispatcher = JobDispatcher::new(&stores);
        assert_eq!(
            dispatcher.process(Job::verify_user(id)).await.unwrap(),
            JobOutcome::UserVerified(VerificationOutcome::Verified)
        );
        // A user id is not a transaction id
        assert_eq!(
            dispatcher.process(Job::settle_transaction(id)).await.unwrap(),
            JobOutcome::Dropped
        );
    }
}
