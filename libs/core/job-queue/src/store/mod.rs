//! Storage seam for the queue.
//!
//! The queue only needs durable, ordered, retry-capable storage with
//! per-job state; everything behind [`JobStore`] is a backend detail.
//! [`RedisJobStore`] is the production backend, [`MemoryJobStore`] backs
//! development and tests with identical semantics (minus durability).

mod memory;
mod redis;
mod transitions;

pub use memory::MemoryJobStore;
pub use redis::RedisJobStore;

use crate::error::Result;
use crate::job::{JobId, JobRecord, QueueCounts};
use async_trait::async_trait;
use std::time::Duration;

/// What became of a failed job after the retry policy was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Below the attempt ceiling: re-scheduled as `delayed`.
    Retrying { attempts: u32, delay: Duration },
    /// Ceiling reached: terminal `failed`.
    Exhausted { attempts: u32 },
}

/// Backend contract for queue storage.
///
/// All per-job mutation (claim, state transition, eviction) must be atomic
/// at the level of a single record; the store — not the callers — is
/// responsible for mutual exclusion between workers. In particular,
/// [`claim`](JobStore::claim) hands a given job to at most one worker.
#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    /// Durably insert a new record in `waiting` or `delayed` state.
    async fn insert(&self, record: &JobRecord) -> Result<()>;

    /// Atomically claim the next eligible waiting job for `worker_id`,
    /// transitioning it to `active`. Returns `None` when nothing is
    /// eligible.
    async fn claim(&self, worker_id: &str) -> Result<Option<JobRecord>>;

    /// Settle a claimed job as terminal `completed`.
    async fn complete(&self, job: &JobRecord) -> Result<()>;

    /// Record a transient failure on a claimed job: increments attempts,
    /// then either re-schedules with backoff or settles as terminal
    /// `failed` when the ceiling is reached.
    async fn fail(&self, job: &JobRecord, error: &str) -> Result<FailOutcome>;

    /// Settle a claimed job as terminal `failed` immediately, bypassing
    /// the retry policy (permanent dispatch/handler errors).
    async fn discard(&self, job: &JobRecord, error: &str) -> Result<()>;

    /// Move delayed jobs whose scheduled time has passed into the waiting
    /// queue. Returns how many were promoted.
    async fn promote_due(&self) -> Result<usize>;

    /// Delete terminal jobs whose retention window has elapsed. Returns
    /// how many were evicted.
    async fn evict_expired(&self) -> Result<usize>;

    /// Fetch a record by id; `None` for unknown or already-evicted jobs.
    async fn fetch(&self, id: &JobId) -> Result<Option<JobRecord>>;

    /// Aggregate per-state counts plus the paused flag.
    async fn counts(&self) -> Result<QueueCounts>;

    async fn set_paused(&self, paused: bool) -> Result<()>;

    async fn is_paused(&self) -> Result<bool>;

    /// Remove a job that is still `waiting` or `delayed`. Active and
    /// terminal jobs are left alone. Returns whether anything was removed.
    async fn cancel(&self, id: &JobId) -> Result<bool>;

    /// Cheap reachability check.
    async fn ping(&self) -> Result<()>;
}
