//! Durable background job queue for transactional notifications.
//!
//! Decouples "decide to send" from "actually deliver": callers enqueue a
//! [`NewJob`] through the [`QueueClient`], a [`WorkerPool`] later claims it
//! from the store, dispatches by kind to a [`Processor`], and reports the
//! outcome back so the store can retry with backoff or settle the job in a
//! terminal state.
//!
//! ## Architecture
//!
//! - [`JobRecord`] — the unit of work as it lives in the store.
//! - [`JobStore`] — backend seam. [`RedisJobStore`] is the durable
//!   production backend; [`MemoryJobStore`] backs development and tests.
//! - [`QueueClient`] — lazily-initialized handle owning the store
//!   connection. Degrades to a cached "unavailable" mode instead of
//!   erroring when the store cannot be reached.
//! - [`WorkerPool`] — bounded concurrent executors pulling claimed jobs,
//!   with delayed-job promotion and terminal-job eviction on the side.
//! - [`dispatch`] — the single kind → handler entry point, shared between
//!   the pool and any direct (non-durable) execution path.
//!
//! ## Delivery semantics
//!
//! At-least-once with bounded retries: a handler failure re-schedules the
//! job with exponential backoff until `max_attempts` is exhausted, then the
//! job settles as `failed` with its last error kept for inspection.
//! Terminal jobs are evicted after a retention window, not stored forever.

pub mod backoff;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod job;
pub mod store;
pub mod worker;

pub use backoff::BackoffStrategy;
pub use client::{Availability, QueueClient};
pub use config::QueueConfig;
pub use error::{ErrorCategory, QueueError, Result};
pub use events::QueueEvent;
pub use job::{
    EnqueueOutcome, JobId, JobKind, JobRecord, JobState, JobStatusReport, NewJob, QueueCounts,
};
pub use store::{FailOutcome, JobStore, MemoryJobStore, RedisJobStore};
pub use worker::{dispatch, Processor, WorkerPool};
