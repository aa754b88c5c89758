//! Worker pool: bounded concurrent claim-and-execute over the job store.
//!
//! The pool claims eligible jobs, dispatches each by kind to the
//! registered [`Processor`], and reports the outcome back to the store,
//! which applies the retry policy. Two background tasks run alongside the
//! claim loop: the delayed-job promoter and the terminal-job evictor.

use crate::config::QueueConfig;
use crate::error::{ErrorCategory, QueueError, Result};
use crate::events::QueueEvent;
use crate::job::{JobKind, JobRecord};
use crate::store::{FailOutcome, JobStore};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// A typed job handler.
///
/// One processor serves the whole queue: it declares its kind enum and
/// handles every variant (the `match` inside `process` is exhaustive, so a
/// kind without a handler is a compile error).
#[async_trait]
pub trait Processor: Send + Sync + 'static {
    type Kind: JobKind;

    /// Execute one job. Transient errors drive the backoff policy;
    /// permanent errors settle the job as `failed` immediately.
    async fn process(&self, kind: Self::Kind, job: &JobRecord) -> Result<()>;

    /// Processor name for logging.
    fn name(&self) -> &'static str;
}

/// Parse the record's kind tag and invoke the matching handler.
///
/// This is the single dispatch entry point: the pooled worker and the
/// direct-execution fallback both go through it, so the two modes cannot
/// diverge. An unrecognized tag is a permanent dispatch error.
pub async fn dispatch<P: Processor>(processor: &P, job: &JobRecord) -> Result<()> {
    let kind = job
        .kind
        .parse::<P::Kind>()
        .map_err(|_| QueueError::UnknownKind(job.kind.clone()))?;
    processor.process(kind, job).await
}

/// Bounded pool of job executors over a shared store.
pub struct WorkerPool<P: Processor> {
    store: Arc<dyn JobStore>,
    processor: Arc<P>,
    config: QueueConfig,
    worker_id: String,
    semaphore: Arc<Semaphore>,
    events: broadcast::Sender<QueueEvent>,
}

impl<P: Processor> WorkerPool<P> {
    pub fn new(store: Arc<dyn JobStore>, processor: P, config: QueueConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.concurrency));
        let (events, _) = broadcast::channel(64);

        Self {
            store,
            processor: Arc::new(processor),
            worker_id: format!("worker-{}", Uuid::new_v4()),
            semaphore,
            events,
            config,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Subscribe to job lifecycle events. Subscribe before `run` so no
    /// transition is missed; the stream ends when the pool is dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Run until the shutdown signal flips to `true`. Stops claiming
    /// immediately on shutdown, waits (bounded) for in-flight jobs, then
    /// stops the promoter and evictor.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            worker_id = %self.worker_id,
            concurrency = %self.config.concurrency,
            processor = %self.processor.name(),
            "Starting worker pool"
        );

        let promoter = self.spawn_promoter(shutdown.clone());
        let evictor = self.spawn_evictor(shutdown.clone());

        loop {
            if *shutdown.borrow() {
                break;
            }

            // Take the permit before claiming so a saturated pool never
            // claims a job it cannot start.
            let permit = tokio::select! {
                permit = Arc::clone(&self.semaphore).acquire_owned() => {
                    match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    }
                }
                _ = shutdown.changed() => continue,
            };

            match self.store.is_paused().await {
                Ok(true) => {
                    drop(permit);
                    self.idle(&mut shutdown, self.config.poll_interval).await;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    drop(permit);
                    warn!(error = %e, "Paused check failed");
                    self.idle(&mut shutdown, Duration::from_secs(1)).await;
                    continue;
                }
            }

            match self.store.claim(&self.worker_id).await {
                Ok(Some(job)) => {
                    let store = Arc::clone(&self.store);
                    let processor = Arc::clone(&self.processor);
                    let events = self.events.clone();
                    let job_timeout = self.config.job_timeout;

                    tokio::spawn(async move {
                        let _permit = permit;
                        Self::execute(store, processor, events, job, job_timeout).await;
                    });
                }
                Ok(None) => {
                    drop(permit);
                    self.idle(&mut shutdown, self.config.poll_interval).await;
                }
                Err(e) => {
                    drop(permit);
                    error!(error = %e, "Failed to claim job");
                    self.idle(&mut shutdown, Duration::from_secs(1)).await;
                }
            }
        }

        self.drain().await;
        promoter.abort();
        evictor.abort();
        info!(worker_id = %self.worker_id, "Worker pool stopped");
        Ok(())
    }

    /// Sleep for `duration`, waking early on a shutdown edge.
    async fn idle(&self, shutdown: &mut watch::Receiver<bool>, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = shutdown.changed() => {}
        }
    }

    /// Wait for in-flight jobs, bounded by the shutdown timeout.
    async fn drain(&self) {
        let in_flight = self.config.concurrency - self.semaphore.available_permits();
        if in_flight == 0 {
            return;
        }

        info!(in_flight = %in_flight, "Waiting for active jobs to finish");
        let all_permits = Arc::clone(&self.semaphore).acquire_many_owned(self.config.concurrency as u32);
        match tokio::time::timeout(self.config.shutdown_timeout, all_permits).await {
            Ok(_) => info!("All active jobs finished"),
            Err(_) => {
                let remaining = self.config.concurrency - self.semaphore.available_permits();
                warn!(remaining = %remaining, "Shutdown timeout reached with jobs still running");
            }
        }
    }

    fn spawn_promoter(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let period = self.config.promote_interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                if *shutdown.borrow() {
                    break;
                }
                match store.promote_due().await {
                    Ok(0) => {}
                    Ok(promoted) => debug!(promoted = %promoted, "Promoted delayed jobs"),
                    Err(e) => warn!(error = %e, "Failed to promote delayed jobs"),
                }
            }
        })
    }

    fn spawn_evictor(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let period = self.config.evict_interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                if *shutdown.borrow() {
                    break;
                }
                match store.evict_expired().await {
                    Ok(0) => {}
                    Ok(evicted) => debug!(evicted = %evicted, "Evicted expired terminal jobs"),
                    Err(e) => warn!(error = %e, "Failed to evict terminal jobs"),
                }
            }
        })
    }

    /// Execute one claimed job and report the outcome. Handler errors never
    /// escape: every outcome becomes a state transition.
    async fn execute(
        store: Arc<dyn JobStore>,
        processor: Arc<P>,
        events: broadcast::Sender<QueueEvent>,
        job: JobRecord,
        job_timeout: Duration,
    ) {
        let started = std::time::Instant::now();

        let result = match tokio::time::timeout(job_timeout, dispatch(processor.as_ref(), &job)).await
        {
            Ok(result) => result,
            Err(_) => Err(QueueError::Timeout(job_timeout)),
        };

        match result {
            Ok(()) => {
                if let Err(e) = store.complete(&job).await {
                    error!(job_id = %job.id, error = %e, "Failed to record completion");
                    return;
                }
                info!(
                    job_id = %job.id,
                    kind = %job.kind,
                    elapsed_ms = %started.elapsed().as_millis(),
                    "Job completed"
                );
                let _ = events.send(QueueEvent::Completed {
                    id: job.id,
                    kind: job.kind.clone(),
                });
            }
            Err(e) if e.category() == ErrorCategory::Permanent => {
                let message = e.to_string();
                if let Err(err) = store.discard(&job, &message).await {
                    error!(job_id = %job.id, error = %err, "Failed to record permanent failure");
                    return;
                }
                warn!(job_id = %job.id, kind = %job.kind, error = %message, "Job failed permanently");
                let _ = events.send(QueueEvent::Failed {
                    id: job.id,
                    kind: job.kind.clone(),
                    attempts: job.attempts.saturating_add(1).min(job.max_attempts),
                    error: message,
                });
            }
            Err(e) => {
                let message = e.to_string();
                match store.fail(&job, &message).await {
                    Ok(FailOutcome::Retrying { attempts, delay }) => {
                        warn!(
                            job_id = %job.id,
                            kind = %job.kind,
                            attempts = %attempts,
                            delay_ms = %delay.as_millis(),
                            error = %message,
                            "Job failed; retry scheduled"
                        );
                        let _ = events.send(QueueEvent::Retrying {
                            id: job.id,
                            kind: job.kind.clone(),
                            attempts,
                            delay,
                            error: message,
                        });
                    }
                    Ok(FailOutcome::Exhausted { attempts }) => {
                        error!(
                            job_id = %job.id,
                            kind = %job.kind,
                            attempts = %attempts,
                            error = %message,
                            "Job failed; attempts exhausted"
                        );
                        let _ = events.send(QueueEvent::Failed {
                            id: job.id,
                            kind: job.kind.clone(),
                            attempts,
                            error: message,
                        });
                    }
                    Err(err) => {
                        error!(job_id = %job.id, error = %err, "Failed to record failure");
                    }
                }
            }
        }
    }
}
