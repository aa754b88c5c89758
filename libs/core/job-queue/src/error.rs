//! Queue error types and retry categorization.
//!
//! Errors carry a category that decides what the worker does with a failed
//! job:
//! - **Transient**: retry with backoff until `max_attempts` is exhausted
//! - **Permanent**: settle as `failed` immediately, no retry

use thiserror::Error;

/// Category of a failure, used to decide retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Temporary failure; the job is re-scheduled with backoff.
    Transient,
    /// Unrecoverable failure; the job settles as `failed` on the spot.
    Permanent,
}

/// Errors produced by the queue, its store, and job execution.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Queue store unavailable: {0}")]
    Unavailable(String),

    #[error("Job not found: {0}")]
    JobNotFound(crate::job::JobId),

    #[error("No handler registered for job kind '{0}'")]
    UnknownKind(String),

    #[error("Corrupt job record: {0}")]
    Corrupt(String),

    #[error("Handler failed: {message}")]
    Handler {
        message: String,
        category: ErrorCategory,
    },

    #[error("Handler timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl QueueError {
    /// A retryable handler failure (provider rejection, network error, ...).
    pub fn transient(message: impl Into<String>) -> Self {
        QueueError::Handler {
            message: message.into(),
            category: ErrorCategory::Transient,
        }
    }

    /// A non-retryable handler failure (undecodable payload, bad template
    /// data, ...).
    pub fn permanent(message: impl Into<String>) -> Self {
        QueueError::Handler {
            message: message.into(),
            category: ErrorCategory::Permanent,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            QueueError::Redis(_) => ErrorCategory::Transient,
            QueueError::Serialization(_) => ErrorCategory::Permanent,
            QueueError::Unavailable(_) => ErrorCategory::Transient,
            QueueError::JobNotFound(_) => ErrorCategory::Permanent,
            QueueError::UnknownKind(_) => ErrorCategory::Permanent,
            QueueError::Corrupt(_) => ErrorCategory::Permanent,
            QueueError::Handler { category, .. } => *category,
            QueueError::Timeout(_) => ErrorCategory::Transient,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;
