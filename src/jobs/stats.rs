//! Worker statistics
//!
//! Lock-free counters the worker pool updates after every job. Dropped
//! jobs (subject not found) never reach the original caller, so these
//! counters are the only place they show up besides the logs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::aggregate::{TransactionStatus, VerificationOutcome};

use super::JobOutcome;

#[derive(Debug, Default)]
pub struct WorkerStats {
    jobs_started: AtomicU64,
    in_flight: AtomicU64,
    users_verified: AtomicU64,
    verifications_unchanged: AtomicU64,
    transactions_completed: AtomicU64,
    transactions_failed: AtomicU64,
    jobs_skipped: AtomicU64,
    jobs_dropped: AtomicU64,
    job_errors: AtomicU64,
    job_panics: AtomicU64,
}

/// Point-in-time copy of [`WorkerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub jobs_started: u64,
    pub in_flight: u64,
    pub users_verified: u64,
    pub verifications_unchanged: u64,
    pub transactions_completed: u64,
    pub transactions_failed: u64,
    pub jobs_skipped: u64,
    pub jobs_dropped: u64,
    pub job_errors: u64,
    pub job_panics: u64,
}

impl StatsSnapshot {
    /// Jobs that ran to an end, whatever the end was
    pub fn jobs_finished(&self) -> u64 {
        self.users_verified
            + self.verifications_unchanged
            + self.transactions_completed
            + self.transactions_failed
            + self.jobs_skipped
            + self.jobs_dropped
            + self.job_errors
            + self.job_panics
    }
}

/// Decrements the in-flight gauge when dropped, including on panic
pub(crate) struct InFlightGuard(Arc<WorkerStats>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

impl WorkerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn job_started(self: &Arc<Self>) -> InFlightGuard {
        self.jobs_started.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard(Arc::clone(self))
    }

    pub fn record(&self, outcome: &JobOutcome) {
        let counter = match outcome {
            JobOutcome::UserVerified(VerificationOutcome::Verified) => &self.users_verified,
            JobOutcome::UserVerified(_) => &self.verifications_unchanged,
            JobOutcome::TransactionSettled(TransactionStatus::Completed) => {
                &self.transactions_completed
            }
            JobOutcome::TransactionSettled(_) => &self.transactions_failed,
            JobOutcome::Skipped => &self.jobs_skipped,
            JobOutcome::Dropped => &self.jobs_dropped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.job_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_panic(&self) {
        self.job_panics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            jobs_started: self.jobs_started.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            users_verified: self.users_verified.load(Ordering::Relaxed),
            verifications_unchanged: self.verifications_unchanged.load(Ordering::Relaxed),
            transactions_completed: self.transactions_completed.load(Ordering::Relaxed),
            transactions_failed: self.transactions_failed.load(Ordering::Relaxed),
            jobs_skipped: self.jobs_skipped.load(Ordering::Relaxed),
            jobs_dropped: self.jobs_dropped.load(Ordering::Relaxed),
            job_errors: self.job_errors.load(Ordering::Relaxed),
            job_panics: self.job_panics.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcomes() {
        let stats = WorkerStats::new();
        stats.record(&JobOutcome::UserVerified(VerificationOutcome::Verified));
        stats.record(&JobOutcome::UserVerified(VerificationOutcome::Exempt));
        stats.record(&JobOutcome::TransactionSettled(TransactionStatus::Completed));
        stats.record(&JobOutcome::TransactionSettled(TransactionStatus::Failed));
        stats.record(&JobOutcome::Dropped);
        stats.record_panic();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.users_verified, 1);
        assert_eq!(snapshot.verifications_unchanged, 1);
        assert_eq!(snapshot.transactions_completed, 1);
        assert_eq!(snapshot.transactions_failed, 1);
        assert_eq!(snapshot.jobs_dropped, 1);
        assert_eq!(snapshot.job_panics, 1);
        assert_eq!(snapshot.jobs_finished(), 6);
    }

    #[test]
    fn test_in_flight_guard() {
        let stats = Arc::new(WorkerStats::new());
        {
            let _guard = stats.job_started();
            assert_eq!(stats.snapshot().in_flight, 1);
        }
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.in_flight, 0);
        assert_eq!(snapshot.jobs_started, 1);
    }
}
