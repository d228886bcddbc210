//! Process host
//!
//! Wires the stores, the job queue, the worker pool and intake together.

use std::sync::Arc;
use std::time::Duration;

use crate::api::AppState;
use crate::audit::LedgerAuditService;
use crate::config::Config;
use crate::handlers::{IntakeService, JobDispatcher};
use crate::jobs::{JobQueue, ShutdownReport, WorkerPool, WorkerStats};
use crate::store::Stores;

/// A running engine
pub struct App {
    stores: Stores,
    queue: JobQueue,
    pool: WorkerPool,
    intake: IntakeService,
    audit: LedgerAuditService,
}

impl App {
    /// Start the worker pool against `stores`. Must be called inside a
    /// tokio runtime.
    pub fn start(config: &Config, stores: Stores) -> Self {
        let (queue, receiver) = JobQueue::bounded(config.queue_capacity);
        let stats = Arc::new(WorkerStats::new());
        let pool = WorkerPool::start(
            config.worker_pool(),
            receiver,
            Arc::new(JobDispatcher::new(&stores)),
            stats,
        );

        let intake = IntakeService::new(stores.clone(), queue.clone(), config.starting_balance());
        let audit = LedgerAuditService::new(stores.wallets.clone());

        tracing::info!(
            workers = config.worker_count,
            queue_capacity = config.queue_capacity,
            starting_credit = config.starting_credit,
            "Engine started"
        );

        Self {
            stores,
            queue,
            pool,
            intake,
            audit,
        }
    }

    pub fn intake(&self) -> &IntakeService {
        &self.intake
    }

    pub fn audit(&self) -> &LedgerAuditService {
        &self.audit
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        self.pool.stats()
    }

    /// State for the HTTP routes
    pub fn state(&self) -> AppState {
        AppState {
            intake: self.intake.clone(),
            queue: self.queue.clone(),
            stats: self.pool.stats(),
            audit: self.audit.clone(),
        }
    }

    /// Stop intake, drain the queue for up to `deadline`, and report.
    pub async fn shutdown(self, deadline: Duration) -> ShutdownReport {
        let report = self.pool.shutdown(&self.queue, deadline).await;

        match self.audit.verify().await {
            Ok(audit) if audit.is_valid => {
                tracing::info!(total_balance = %audit.total_balance, "Ledger balanced at shutdown")
            }
            Ok(_) => tracing::error!("Ledger unbalanced at shutdown"),
            Err(e) => tracing::error!(error = %e, "Ledger audit failed at shutdown"),
        }

        report
    }
}
