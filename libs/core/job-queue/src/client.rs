//! Queue client: the process-wide handle to the queue store.
//!
//! An explicit handle created once at startup and passed by reference to
//! enqueuers and the worker — no module-level global. Initialization is
//! lazy and idempotent, and a store that cannot be reached degrades the
//! client to a cached "unavailable" mode instead of erroring: `enqueue`
//! and `status` always return structured outcomes, never a store error.

use crate::config::QueueConfig;
use crate::job::{EnqueueOutcome, JobId, JobStatusReport, NewJob, QueueCounts};
use crate::store::{JobStore, RedisJobStore};
use crate::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of [`QueueClient::initialize`].
#[derive(Debug, Clone)]
pub enum Availability {
    Ready,
    Unavailable { reason: String },
}

impl Availability {
    pub fn is_ready(&self) -> bool {
        matches!(self, Availability::Ready)
    }
}

enum ClientState {
    /// Not yet initialized (or closed).
    Idle,
    Ready(Arc<dyn JobStore>),
    /// Initialization failed; cached until `close()` resets the handle.
    Unavailable(String),
}

pub struct QueueClient {
    config: QueueConfig,
    state: Mutex<ClientState>,
}

impl QueueClient {
    /// A client that will lazily connect to the configured Redis store on
    /// first use.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ClientState::Idle),
        }
    }

    /// A client wired to an existing backend (embedded setups, tests).
    pub fn with_store(config: QueueConfig, store: Arc<dyn JobStore>) -> Self {
        Self {
            config,
            state: Mutex::new(ClientState::Ready(store)),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Idempotent, lazy initialization. The first call attempts the store
    /// connection; failure is cached as `Unavailable` (and logged) rather
    /// than returned as an error. Subsequent calls return the cached
    /// result until [`close`](Self::close).
    pub async fn initialize(&self) -> Availability {
        match self.store().await {
            Ok(_) => Availability::Ready,
            Err(reason) => Availability::Unavailable { reason },
        }
    }

    /// The connected backend, if the store is reachable. Used to share the
    /// client's connection with a worker pool.
    pub async fn backend(&self) -> Option<Arc<dyn JobStore>> {
        self.store().await.ok()
    }

    async fn store(&self) -> std::result::Result<Arc<dyn JobStore>, String> {
        let mut state = self.state.lock().await;

        match &*state {
            ClientState::Ready(store) => return Ok(Arc::clone(store)),
            ClientState::Unavailable(reason) => return Err(reason.clone()),
            ClientState::Idle => {}
        }

        match RedisJobStore::connect(&self.config).await {
            Ok(store) => {
                info!(
                    host = %self.config.redis.host,
                    port = %self.config.redis.port,
                    "Queue client initialized"
                );
                let store: Arc<dyn JobStore> = Arc::new(store);
                *state = ClientState::Ready(Arc::clone(&store));
                Ok(store)
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(
                    host = %self.config.redis.host,
                    port = %self.config.redis.port,
                    error = %reason,
                    "Queue store unavailable; client degraded to unavailable mode"
                );
                *state = ClientState::Unavailable(reason.clone());
                Err(reason)
            }
        }
    }

    /// Durably enqueue a job. On success the record is in `waiting` (or
    /// `delayed`) before this returns. Kind validity is the worker's
    /// concern — unrecognized kinds are accepted here and fail at
    /// dispatch.
    pub async fn enqueue(&self, job: NewJob) -> EnqueueOutcome {
        let store = match self.store().await {
            Ok(store) => store,
            Err(reason) => return EnqueueOutcome::unavailable(reason),
        };

        let record = job.into_record(
            self.config.default_max_attempts,
            self.config.default_backoff,
        );
        match store.insert(&record).await {
            Ok(()) => {
                debug!(
                    job_id = %record.id,
                    kind = %record.kind,
                    recipient = %record.recipient,
                    state = %record.state,
                    "Enqueued job"
                );
                EnqueueOutcome::queued(record.id)
            }
            Err(e) => {
                warn!(kind = %record.kind, error = %e, "Failed to enqueue job");
                EnqueueOutcome::failed(e.to_string())
            }
        }
    }

    /// Current state, attempts, and last failure reason of a job.
    /// `found = false` for unknown or already-evicted ids.
    pub async fn status(&self, id: &JobId) -> JobStatusReport {
        let store = match self.store().await {
            Ok(store) => store,
            Err(reason) => return JobStatusReport::unavailable(reason),
        };

        match store.fetch(id).await {
            Ok(Some(record)) => JobStatusReport::of(&record),
            Ok(None) => JobStatusReport::not_found(),
            Err(e) => {
                warn!(job_id = %id, error = %e, "Status lookup failed");
                JobStatusReport::unavailable(e.to_string())
            }
        }
    }

    /// Aggregate per-state counts for operational visibility.
    pub async fn counts(&self) -> Result<QueueCounts> {
        let store = self
            .store()
            .await
            .map_err(crate::QueueError::Unavailable)?;
        store.counts().await
    }

    /// Stop workers from claiming new jobs. In-flight jobs finish.
    pub async fn pause(&self) -> Result<()> {
        let store = self
            .store()
            .await
            .map_err(crate::QueueError::Unavailable)?;
        store.set_paused(true).await
    }

    pub async fn resume(&self) -> Result<()> {
        let store = self
            .store()
            .await
            .map_err(crate::QueueError::Unavailable)?;
        store.set_paused(false).await
    }

    /// Remove a job that has not been claimed yet (`waiting`/`delayed`).
    /// Jobs already `active` are not preempted.
    pub async fn cancel(&self, id: &JobId) -> Result<bool> {
        let store = self
            .store()
            .await
            .map_err(crate::QueueError::Unavailable)?;
        store.cancel(id).await
    }

    /// Drop the store handle. Safe to call repeatedly; the next operation
    /// re-initializes from scratch (including a fresh connection attempt
    /// after a cached unavailable result).
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        *state = ClientState::Idle;
    }
}
