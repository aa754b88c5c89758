//! Queue lifecycle events.
//!
//! Observability hook, not part of the correctness contract: the worker
//! pool emits an event per settled outcome on a broadcast channel.
//! Subscribe at startup via [`WorkerPool::subscribe`](crate::WorkerPool::subscribe);
//! receivers drain and end when the pool drops its sender at shutdown.
//! Events published with no subscriber are discarded.

use crate::job::JobId;
use serde::Serialize;
use std::time::Duration;

/// An observable job state transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum QueueEvent {
    /// Handler succeeded; the job is terminal `completed`.
    Completed { id: JobId, kind: String },
    /// Handler failed; the job re-enters `delayed` until backoff elapses.
    Retrying {
        id: JobId,
        kind: String,
        attempts: u32,
        delay: Duration,
        error: String,
    },
    /// The job is terminal `failed` (attempts exhausted or permanent error).
    Failed {
        id: JobId,
        kind: String,
        attempts: u32,
        error: String,
    },
}
