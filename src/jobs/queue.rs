//! Job Queue
//!
//! Bounded FIFO between intake and the worker pool. Any number of producers
//! hold a `JobQueue`; every worker holds a `JobReceiver` and they take turns
//! waiting on the shared channel.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Mutex, Notify, RwLock};

use super::Job;

/// Enqueue errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Job queue is closed")]
    Closed,
}

/// Sends that have been promised to a producer but not resolved yet
#[derive(Default)]
struct Backlog {
    deferred: AtomicU64,
    pending: AtomicUsize,
    idle: Notify,
    lost: Mutex<Vec<Job>>,
}

/// Counts one open reservation for as long as it lives
struct PendingSend(Arc<Backlog>);

impl PendingSend {
    fn enter(backlog: &Arc<Backlog>) -> Self {
        backlog.pending.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(backlog))
    }
}

impl Drop for PendingSend {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Producer side of the job queue
#[derive(Clone)]
pub struct JobQueue {
    sender: Arc<RwLock<Option<mpsc::Sender<Job>>>>,
    capacity: usize,
    backlog: Arc<Backlog>,
}

/// A place in the queue taken before the job exists.
///
/// Closing the queue does not revoke a slot: a slot reserved while the queue
/// was open still delivers its job to the workers.
pub struct JobSlot {
    sender: mpsc::Sender<Job>,
    capacity: usize,
    backlog: Arc<Backlog>,
    pending: PendingSend,
}

/// Consumer side of the job queue, shared by all workers
#[derive(Clone)]
pub struct JobReceiver {
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` buffered jobs
    pub fn bounded(capacity: usize) -> (JobQueue, JobReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        let queue = JobQueue {
            sender: Arc::new(RwLock::new(Some(tx))),
            capacity,
            backlog: Arc::new(Backlog::default()),
        };
        let receiver = JobReceiver {
            receiver: Arc::new(Mutex::new(rx)),
        };
        (queue, receiver)
    }

    /// Take a slot for a job, failing only if the queue is closed.
    pub async fn reserve(&self) -> Result<JobSlot, QueueError> {
        let guard = self.sender.read().await;
        let sender = guard.as_ref().ok_or(QueueError::Closed)?;
        Ok(JobSlot {
            sender: sender.clone(),
            capacity: self.capacity,
            backlog: Arc::clone(&self.backlog),
            pending: PendingSend::enter(&self.backlog),
        })
    }

    /// Enqueue a job, waiting for room if the queue is full.
    pub async fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        let sender = self.sender.read().await.clone().ok_or(QueueError::Closed)?;
        sender.send(job).await.map_err(|_| QueueError::Closed)?;
        tracing::debug!(job = %job, "Added job");
        Ok(())
    }

    /// Enqueue a job without making the caller wait.
    pub async fn submit(&self, job: Job) -> Result<(), QueueError> {
        self.reserve().await?.submit(job).await;
        Ok(())
    }

    /// Stop accepting jobs. Already buffered and deferred jobs still reach
    /// the workers.
    pub async fn close(&self) {
        if self.sender.write().await.take().is_some() {
            tracing::info!("Job queue closed to new jobs");
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.sender.read().await.is_none()
    }

    /// Wait for every open slot and deferred send to resolve, then take the
    /// jobs that never reached the channel.
    ///
    /// Only returns promptly once the receiver has been drained or closed.
    pub async fn settle_deferred(&self) -> Vec<Job> {
        loop {
            let idle = self.backlog.idle.notified();
            if self.backlog.pending.load(Ordering::Acquire) == 0 {
                break;
            }
            idle.await;
        }
        std::mem::take(&mut *self.backlog.lost.lock().await)
    }

    /// Number of jobs currently buffered
    pub async fn depth(&self) -> usize {
        match self.sender.read().await.as_ref() {
            Some(sender) => sender.max_capacity() - sender.capacity(),
            None => 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How many submissions found the queue full
    pub fn deferred_count(&self) -> u64 {
        self.backlog.deferred.load(Ordering::Relaxed)
    }
}

impl JobSlot {
    /// Hand the job to the workers.
    ///
    /// If the buffer is full the send moves to a background task that holds
    /// this slot, so the job is still delivered (in order behind the backlog)
    /// once workers make room. A job whose receiver is already gone is kept
    /// for `JobQueue::settle_deferred`.
    pub async fn submit(self, job: Job) {
        let JobSlot {
            sender,
            capacity,
            backlog,
            pending,
        } = self;

        match sender.try_send(job) {
            Ok(()) => tracing::debug!(job = %job, "Added job"),
            Err(TrySendError::Full(job)) => {
                backlog.deferred.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(job = %job, capacity, "Job queue full, deferring enqueue");
                tokio::spawn(async move {
                    let _pending = pending;
                    match sender.send(job).await {
                        Ok(()) => tracing::debug!(job = %job, "Added deferred job"),
                        Err(e) => {
                            tracing::error!(
                                job = %e.0,
                                "Deferred job could not be enqueued: workers are gone"
                            );
                            backlog.lost.lock().await.push(e.0);
                        }
                    }
                });
            }
            Err(TrySendError::Closed(job)) => {
                tracing::error!(job = %job, "Job could not be enqueued: workers are gone");
                backlog.lost.lock().await.push(job);
                drop(pending);
            }
        }
    }
}

impl JobReceiver {
    /// Wait for the next job.
    ///
    /// Returns `None` once the queue is closed, every deferred send has
    /// landed, and the buffer is empty.
    pub async fn recv(&self) -> Option<Job> {
        self.receiver.lock().await.recv().await
    }

    /// Refuse further sends and take whatever is still buffered.
    pub async fn drain_remaining(&self) -> Vec<Job> {
        let mut receiver = self.receiver.lock().await;
        receiver.close();
        let mut remaining = Vec::new();
        while let Ok(job) = receiver.try_recv() {
            remaining.push(job);
        }
        remaining
    }
}
