//! In-process backfill job queue and worker.
//!
//! Jobs are delivered at least once. A job for a `(token, network)` whose
//! walk is already running is skipped; walks for different tokens run
//! concurrently up to a configured limit. Only the most recent finished
//! statuses are retained.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy::primitives::Address;
use parking_lot::Mutex;
use pricehistory_chain::Network;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::{BackfillJob, BackfillReport, BackfillWalker};

/// Identifier assigned to an enqueued job.
pub type JobId = u64;

/// Lifecycle state of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum JobStatus {
    Queued,
    Running,
    Done { report: BackfillReport },
    Failed { error: String },
    /// Duplicate delivery while the same walk was running
    Skipped,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("backfill worker has stopped")]
    Closed,
}

/// Finished job statuses kept by default.
pub const DEFAULT_STATUS_RETENTION: usize = 4096;

#[derive(Debug)]
struct Registry {
    statuses: HashMap<JobId, JobStatus>,
    in_flight: HashSet<(Address, Network)>,
    /// Finished job ids, oldest first
    finished: VecDeque<JobId>,
    retention: usize,
}

impl Registry {
    fn record_final(&mut self, id: JobId, status: JobStatus) {
        self.statuses.insert(id, status);
        self.finished.push_back(id);
        while self.finished.len() > self.retention {
            if let Some(oldest) = self.finished.pop_front() {
                self.statuses.remove(&oldest);
            }
        }
    }
}

/// Shared job status table.
#[derive(Debug, Clone)]
pub struct JobRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_RETENTION)
    }
}

impl JobRegistry {
    /// Registry keeping at most `retention` finished statuses.
    pub fn new(retention: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                statuses: HashMap::new(),
                in_flight: HashSet::new(),
                finished: VecDeque::new(),
                retention,
            })),
        }
    }

    /// Status of `id`, or `None` if unknown or already evicted.
    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.inner.lock().statuses.get(&id).cloned()
    }

    fn set(&self, id: JobId, status: JobStatus) {
        self.inner.lock().statuses.insert(id, status);
    }

    /// Mark the job running unless the same walk is already in flight.
    fn try_start(&self, id: JobId, job: &BackfillJob) -> bool {
        let mut inner = self.inner.lock();
        if !inner.in_flight.insert((job.token, job.network)) {
            inner.record_final(id, JobStatus::Skipped);
            return false;
        }
        inner.statuses.insert(id, JobStatus::Running);
        true
    }

    fn finish(&self, id: JobId, job: &BackfillJob, status: JobStatus) {
        let mut inner = self.inner.lock();
        inner.in_flight.remove(&(job.token, job.network));
        inner.record_final(id, status);
    }
}

#[derive(Debug)]
struct QueuedJob {
    id: JobId,
    job: BackfillJob,
}

/// Producer side of the job queue.
#[derive(Debug, Clone)]
pub struct BackfillQueue {
    tx: mpsc::Sender<QueuedJob>,
    next_id: Arc<AtomicU64>,
    registry: JobRegistry,
}

impl BackfillQueue {
    /// Enqueue a backfill job.
    pub async fn enqueue(&self, job: BackfillJob) -> Result<JobId, QueueError> {
        let slot = self.tx.reserve().await.map_err(|_| QueueError::Closed)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        // Queued must be recorded before the worker can see the job
        self.registry.set(id, JobStatus::Queued);
        slot.send(QueuedJob { id, job });
        debug!(job_id = id, token = %job.token, network = %job.network, "Job enqueued");
        Ok(id)
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }
}

/// Consumer side: runs walks for queued jobs.
pub struct BackfillWorker {
    walker: Arc<BackfillWalker>,
    rx: mpsc::Receiver<QueuedJob>,
    registry: JobRegistry,
    permits: Arc<Semaphore>,
}

impl BackfillWorker {
    /// Create a worker and the queue that feeds it.
    pub fn new(
        walker: Arc<BackfillWalker>,
        queue_capacity: usize,
        max_concurrent_jobs: usize,
    ) -> (Self, BackfillQueue) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let registry = JobRegistry::default();
        let queue = BackfillQueue {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
            registry: registry.clone(),
        };
        let worker = Self {
            walker,
            rx,
            registry,
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        };
        (worker, queue)
    }

    /// Keep at most `retention` finished statuses in the registry.
    pub fn with_status_retention(self, retention: usize) -> Self {
        self.registry.inner.lock().retention = retention;
        self
    }

    /// Process jobs until every queue handle is dropped and in-flight walks finish.
    pub async fn run(mut self) {
        info!("Backfill worker started");
        let mut walks = JoinSet::new();

        while let Some(QueuedJob { id, job }) = self.rx.recv().await {
            // Reap finished walks so the set stays small
            while walks.try_join_next().is_some() {}

            if !self.registry.try_start(id, &job) {
                warn!(job_id = id, token = %job.token, "Walk already running, skipping duplicate job");
                continue;
            }

            let Ok(permit) = self.permits.clone().acquire_owned().await else {
                break;
            };
            let walker = self.walker.clone();
            let registry = self.registry.clone();

            walks.spawn(async move {
                let _permit = permit;
                let walk = tokio::spawn(async move { walker.run(job.token, job.network).await });
                match walk.await {
                    Ok(report) => {
                        info!(job_id = id, days = report.days, failed = report.failed, "Job {} completed", id);
                        registry.finish(id, &job, JobStatus::Done { report });
                    }
                    Err(e) => {
                        error!(job_id = id, error = %e, "Job {} failed", id);
                        registry.finish(id, &job, JobStatus::Failed { error: e.to_string() });
                    }
                }
            });
        }

        while walks.join_next().await.is_some() {}
        info!("Backfill worker stopped");
    }
}
