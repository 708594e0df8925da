//! In-process job queue with bounded concurrency and retries.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use shelfwise_core::ShopDomain;

use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::Instrument;

use super::{Job, JobError, JobRunner};
use crate::config::JobConfig;

/// Jobs buffered before `enqueue` reports [`JobError::QueueFull`].
const QUEUE_CAPACITY: usize = 1024;

/// How long shutdown waits for in-flight jobs before aborting them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Backoff before retry number `attempt + 1`: `base * 2^attempt` seconds.
#[must_use]
pub fn backoff_delay(base_secs: u64, attempt: u32) -> Duration {
    Duration::from_secs(base_secs.saturating_mul(2_u64.saturating_pow(attempt)))
}

/// Shops with a compliance check queued but not yet started.
///
/// A second check for the same shop is folded into the pending one; the
/// entry is cleared when the check starts running, so a change arriving
/// mid-run still gets a follow-up check.
#[derive(Clone, Default)]
struct PendingChecks(Arc<Mutex<HashSet<ShopDomain>>>);

impl PendingChecks {
    /// Mark `shop` pending; `false` if it already was.
    fn claim(&self, shop: &ShopDomain) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(shop.clone())
    }

    fn release(&self, shop: &ShopDomain) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(shop);
    }
}

/// Cloneable sender side of the queue.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<Job>,
    pending_checks: PendingChecks,
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("closed", &self.sender.is_closed())
            .finish_non_exhaustive()
    }
}

impl JobQueue {
    /// Start the worker and return its handle.
    #[must_use]
    pub fn start(runner: Arc<dyn JobRunner>, config: JobConfig) -> JobQueueHandle {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let pending_checks = PendingChecks::default();

        let worker = tokio::spawn(run_worker(
            runner,
            config,
            pending_checks.clone(),
            receiver,
            shutdown_rx,
        ));

        JobQueueHandle {
            queue: Self {
                sender,
                pending_checks,
            },
            shutdown: shutdown_tx,
            worker,
        }
    }

    /// Queue a job without waiting.
    ///
    /// A compliance check for a shop that already has one waiting is
    /// coalesced into it and still reported as queued.
    ///
    /// # Errors
    ///
    /// Returns `JobError::QueueFull` when the buffer is full or
    /// `JobError::QueueClosed` after shutdown.
    pub fn enqueue(&self, job: Job) -> Result<(), JobError> {
        if self.sender.is_closed() {
            return Err(JobError::QueueClosed);
        }

        let name = job.name();
        let shop = job.shop().clone();
        let is_check = matches!(job, Job::CheckCompliance { .. });
        if is_check && !self.pending_checks.claim(&shop) {
            tracing::debug!(shop = %shop, "Compliance check already pending, coalesced");
            return Ok(());
        }

        if let Err(e) = self.sender.try_send(job) {
            if is_check {
                self.pending_checks.release(&shop);
            }
            return Err(match e {
                mpsc::error::TrySendError::Full(_) => JobError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => JobError::QueueClosed,
            });
        }
        tracing::debug!(job = name, shop = %shop, "Job enqueued");
        Ok(())
    }
}

/// Owner of the worker task. Dropping it also stops the worker, without
/// waiting for in-flight jobs.
pub struct JobQueueHandle {
    queue: JobQueue,
    shutdown: oneshot::Sender<()>,
    worker: JoinHandle<()>,
}

impl JobQueueHandle {
    /// A sender for this queue.
    #[must_use]
    pub fn queue(&self) -> JobQueue {
        self.queue.clone()
    }

    /// Stop accepting jobs, let in-flight jobs finish (up to 30 seconds),
    /// and drop anything still pending.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.worker.await {
            tracing::error!(error = %e, "Job worker panicked");
        }
    }
}

async fn run_worker(
    runner: Arc<dyn JobRunner>,
    config: JobConfig,
    pending_checks: PendingChecks,
    mut receiver: mpsc::Receiver<Job>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let config = Arc::new(config);
    let mut tasks = JoinSet::new();

    tracing::info!(concurrency = config.concurrency.max(1), "Job worker started");

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            job = receiver.recv() => {
                let Some(job) = job else { break };
                let span = tracing::info_span!("job", job = job.name(), shop = %job.shop());
                tasks.spawn(
                    process(
                        Arc::clone(&runner),
                        Arc::clone(&config),
                        Arc::clone(&semaphore),
                        pending_checks.clone(),
                        job,
                    )
                    .instrument(span),
                );
            }
            Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Job task panicked");
                }
            }
        }
    }

    receiver.close();
    let dropped = receiver.len();
    if dropped > 0 {
        tracing::warn!(dropped, "Dropping pending jobs at shutdown");
    }

    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        tracing::warn!(in_flight = tasks.len(), "Aborting jobs still running at shutdown");
        tasks.shutdown().await;
    }

    tracing::info!("Job worker stopped");
}

/// Run one job to completion, retrying retryable failures.
async fn process(
    runner: Arc<dyn JobRunner>,
    config: Arc<JobConfig>,
    semaphore: Arc<Semaphore>,
    pending_checks: PendingChecks,
    job: Job,
) {
    let mut attempt: u32 = 0;

    loop {
        let result = {
            let Ok(_permit) = semaphore.acquire().await else {
                return;
            };
            if let Job::CheckCompliance { shop } = &job {
                pending_checks.release(shop);
            }
            tokio::time::timeout(config.max_duration, runner.run(&job))
                .await
                .unwrap_or(Err(JobError::Timeout(config.max_duration)))
        };

        match result {
            Ok(()) => {
                tracing::info!(attempts = attempt + 1, "Job completed");
                return;
            }
            Err(e) if job.is_retryable() && !e.is_permanent() && attempt < config.max_retries => {
                let delay = backoff_delay(config.backoff_base_secs, attempt);
                tracing::warn!(
                    error = %e,
                    attempt = attempt + 1,
                    retry_in_secs = delay.as_secs(),
                    "Job failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, attempts = attempt + 1, "Job failed");
                runner.on_failure(&job, &e).await;
                return;
            }
        }
    }
}
