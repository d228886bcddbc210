//! Worker Pool
//!
//! A fixed number of identical workers draining the job queue. Each job runs
//! in its own task so that a panicking handler takes down neither its worker
//! nor the pool; once a job has been dequeued it always runs to completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout_at, Instant};

use super::{Job, JobProcessor, JobQueue, JobReceiver, StatsSnapshot, WorkerStats};

/// Configuration for the worker pool
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of concurrent workers (default: 3)
    pub workers: usize,
    /// Artificial delay before each job runs (default: none)
    pub job_delay: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            job_delay: Duration::ZERO,
        }
    }
}

/// Report from shutting the pool down
#[derive(Debug, Clone)]
pub struct ShutdownReport {
    /// Every worker exited on its own before the deadline
    pub drained: bool,
    /// Jobs still buffered, or still waiting for room, when the deadline hit
    pub undrained: Vec<Job>,
    pub stats: StatsSnapshot,
}

/// Worker Pool - runs N workers against a shared job receiver
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    receiver: JobReceiver,
    stats: Arc<WorkerStats>,
}

impl WorkerPool {
    /// Start `config.workers` workers in the background
    pub fn start(
        config: WorkerPoolConfig,
        receiver: JobReceiver,
        processor: Arc<dyn JobProcessor>,
        stats: Arc<WorkerStats>,
    ) -> Self {
        let handles = (1..=config.workers)
            .map(|worker_id| {
                let worker = Worker {
                    id: worker_id,
                    receiver: receiver.clone(),
                    processor: Arc::clone(&processor),
                    stats: Arc::clone(&stats),
                    job_delay: config.job_delay,
                };
                tokio::spawn(worker.run())
            })
            .collect();

        tracing::info!(workers = config.workers, "Worker pool started");

        Self {
            handles,
            receiver,
            stats,
        }
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Close the queue, let workers drain it, and wait up to `deadline`.
    ///
    /// Workers still running at the deadline are stopped; jobs they had
    /// already picked up keep running in their own tasks. Jobs left in the
    /// buffer, and deferred sends that never got in, are logged and returned
    /// in the report.
    pub async fn shutdown(self, queue: &JobQueue, deadline: Duration) -> ShutdownReport {
        queue.close().await;

        let deadline_at = Instant::now() + deadline;
        let mut drained = true;
        for mut handle in self.handles {
            if drained {
                match timeout_at(deadline_at, &mut handle).await {
                    Ok(Ok(())) => continue,
                    Ok(Err(e)) => {
                        tracing::error!(error = %e, "Worker task ended abnormally");
                        continue;
                    }
                    Err(_) => {
                        tracing::warn!(?deadline, "Shutdown deadline reached, stopping workers");
                        drained = false;
                    }
                }
            }
            handle.abort();
            let _ = handle.await;
        }

        let mut undrained = self.receiver.drain_remaining().await;
        let lost = queue.settle_deferred().await;
        undrained.extend(self.receiver.drain_remaining().await);
        undrained.extend(lost);
        for job in &undrained {
            tracing::warn!(job = %job, "Job left unprocessed at shutdown");
        }

        let stats = self.stats.snapshot();
        tracing::info!(
            drained,
            undrained = undrained.len(),
            in_flight = stats.in_flight,
            jobs_started = stats.jobs_started,
            "Worker pool stopped"
        );

        ShutdownReport {
            drained: drained && undrained.is_empty(),
            undrained,
            stats,
        }
    }
}

struct Worker {
    id: usize,
    receiver: JobReceiver,
    processor: Arc<dyn JobProcessor>,
    stats: Arc<WorkerStats>,
    job_delay: Duration,
}

impl Worker {
    async fn run(self) {
        tracing::debug!(worker = self.id, "Worker started");

        while let Some(job) = self.receiver.recv().await {
            tracing::info!(worker = self.id, job = %job, "Worker started job");

            let guard = self.stats.job_started();
            let processor = Arc::clone(&self.processor);
            let delay = self.job_delay;
            let task = tokio::spawn(async move {
                let _guard = guard;
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                processor.process(job).await
            });

            match task.await {
                Ok(Ok(outcome)) => {
                    self.stats.record(&outcome);
                    tracing::info!(worker = self.id, job = %job, ?outcome, "Worker finished job");
                }
                Ok(Err(e)) => {
                    self.stats.record_error();
                    tracing::error!(worker = self.id, job = %job, error = %e, "Job failed");
                }
                Err(e) => {
                    self.stats.record_panic();
                    tracing::error!(worker = self.id, job = %job, error = %e, "Job panicked");
                }
            }
        }

        tracing::debug!(worker = self.id, "Worker stopped: queue closed and drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobError, JobOutcome};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    /// Counts jobs; panics on every job whose subject is the nil id
    #[derive(Default)]
    struct CountingProcessor {
        seen: AtomicUsize,
    }

    #[async_trait]
    impl JobProcessor for CountingProcessor {
        async fn process(&self, job: Job) -> Result<JobOutcome, JobError> {
            if job.subject_id.is_nil() {
                panic!("poisoned job");
            }
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(JobOutcome::Skipped)
        }
    }

    #[test]
    fn test_worker_pool_config_default() {
        let config = WorkerPoolConfig::default();
        assert_eq!(config.workers, 3);
        assert_eq!(config.job_delay, Duration::ZERO);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_drains_queue_on_shutdown() {
        let (queue, receiver) = JobQueue::bounded(5);
        let processor = Arc::new(CountingProcessor::default());
        let pool = WorkerPool::start(
            WorkerPoolConfig::default(),
            receiver,
            processor.clone(),
            Arc::new(WorkerStats::new()),
        );
        assert_eq!(pool.size(), 3);

        for _ in 0..20 {
            queue.submit(Job::verify_user(Uuid::new_v4())).await.unwrap();
        }

        let report = pool.shutdown(&queue, Duration::from_secs(5)).await;
        assert!(report.drained);
        assert!(report.undrained.is_empty());
        assert_eq!(processor.seen.load(Ordering::SeqCst), 20);
        assert_eq!(report.stats.jobs_skipped, 20);
        assert_eq!(report.stats.in_flight, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_job_does_not_stop_worker() {
        let (queue, receiver) = JobQueue::bounded(5);
        let processor = Arc::new(CountingProcessor::default());
        let pool = WorkerPool::start(
            WorkerPoolConfig {
                workers: 1,
                job_delay: Duration::ZERO,
            },
            receiver,
            processor.clone(),
            Arc::new(WorkerStats::new()),
        );

        queue.enqueue(Job::verify_user(Uuid::nil())).await.unwrap();
        queue.enqueue(Job::verify_user(Uuid::new_v4())).await.unwrap();

        let report = pool.shutdown(&queue, Duration::from_secs(5)).await;
        assert!(report.drained);
        assert_eq!(report.stats.job_panics, 1);
        assert_eq!(processor.seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_deadline_reports_undrained() {
        let (queue, receiver) = JobQueue::bounded(5);
        let pool = WorkerPool::start(
            WorkerPoolConfig {
                workers: 1,
                job_delay: Duration::from_secs(60),
            },
            receiver,
            Arc::new(CountingProcessor::default()),
            Arc::new(WorkerStats::new()),
        );

        for _ in 0..4 {
            queue.submit(Job::verify_user(Uuid::new_v4())).await.unwrap();
        }
        // Give the single worker time to pick up the first job
        sleep(Duration::from_millis(100)).await;

        let report = pool.shutdown(&queue, Duration::from_millis(100)).await;
        assert!(!report.drained);
        assert_eq!(report.undrained.len(), 3);
        assert_eq!(report.stats.in_flight, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_deadline_reports_deferred_jobs() {
        let (queue, receiver) = JobQueue::bounded(1);
        let pool = WorkerPool::start(
            WorkerPoolConfig {
                workers: 1,
                job_delay: Duration::from_secs(60),
            },
            receiver,
            Arc::new(CountingProcessor::default()),
            Arc::new(WorkerStats::new()),
        );

        queue.submit(Job::verify_user(Uuid::new_v4())).await.unwrap();
        sleep(Duration::from_millis(100)).await;

        let buffered = Job::verify_user(Uuid::new_v4());
        let waiting = Job::settle_transaction(Uuid::new_v4());
        queue.submit(buffered).await.unwrap();
        queue.submit(waiting).await.unwrap();
        assert_eq!(queue.deferred_count(), 1);

        let report = pool.shutdown(&queue, Duration::from_millis(100)).await;
        assert!(!report.drained);
        assert_eq!(report.undrained, vec![buffered, waiting]);
    }
}
