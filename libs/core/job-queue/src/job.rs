//! The job model: wire record, enqueue request, and result shapes.

use crate::backoff::BackoffStrategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Current state of a job.
///
/// `waiting → active → {completed | failed}`, with `delayed` between failed
/// attempts while backoff elapses (and before an enqueue delay expires).
/// `completed` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Waiting,
    Active,
    Delayed,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Waiting => write!(f, "waiting"),
            JobState::Active => write!(f, "active"),
            JobState::Delayed => write!(f, "delayed"),
            JobState::Completed => write!(f, "completed"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// Marker for kind enums the worker can dispatch on.
///
/// The wire record carries the kind as a string tag; a processor's kind
/// enum parses it back at dispatch time. A tag that does not parse is a
/// permanent dispatch error — the closed set of kinds lives in the enum,
/// unknown tags only exist at the wire boundary.
pub trait JobKind: FromStr + fmt::Display + Clone + Send + Sync + 'static {}

impl<T> JobKind for T where T: FromStr + fmt::Display + Clone + Send + Sync + 'static {}

/// The unit of work as stored in the queue.
///
/// Created at enqueue time; after that, only the worker pool (attempts,
/// state, timestamps) and the evictor (deletion) touch it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    /// Kind tag on the wire; parsed into the processor's enum at dispatch.
    pub kind: String,
    /// Destination address.
    pub recipient: String,
    /// Display subject line.
    pub subject: String,
    /// Opaque, kind-specific payload; interpreted only by the handler.
    pub payload: serde_json::Value,
    /// Executed attempts so far. Never exceeds `max_attempts`.
    pub attempts: u32,
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    /// Earliest time the job is eligible to run. Enqueue delay and retry
    /// backoff both land here.
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Last failure reason, kept on the record for inspection.
    pub last_error: Option<String>,
    /// Consumer that currently holds or last held the job.
    pub worker_id: Option<String>,
}

/// An enqueue request: what to send, to whom, and how to retry.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub kind: String,
    pub recipient: String,
    pub subject: String,
    pub payload: serde_json::Value,
    pub delay: Option<Duration>,
    pub max_attempts: Option<u32>,
    pub backoff: Option<BackoffStrategy>,
}

impl NewJob {
    pub fn new(
        kind: impl ToString,
        recipient: impl Into<String>,
        subject: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            kind: kind.to_string(),
            recipient: recipient.into(),
            subject: subject.into(),
            payload,
            delay: None,
            max_attempts: None,
            backoff: None,
        }
    }

    /// Delay before the job first becomes eligible.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Materialize the wire record, filling unset options from defaults.
    pub fn into_record(self, default_max_attempts: u32, default_backoff: BackoffStrategy) -> JobRecord {
        let now = Utc::now();
        let (state, scheduled_at) = match self.delay {
            Some(delay) => (
                JobState::Delayed,
                now + chrono::Duration::milliseconds(delay.as_millis() as i64),
            ),
            None => (JobState::Waiting, now),
        };

        JobRecord {
            id: JobId::new(),
            kind: self.kind,
            recipient: self.recipient,
            subject: self.subject,
            payload: self.payload,
            attempts: 0,
            max_attempts: self.max_attempts.unwrap_or(default_max_attempts).max(1),
            backoff: self.backoff.unwrap_or(default_backoff),
            state,
            created_at: now,
            scheduled_at,
            started_at: None,
            finished_at: None,
            last_error: None,
            worker_id: None,
        }
    }
}

/// Structured result of an enqueue call.
///
/// The client never lets a store error escape `enqueue`; failures show up
/// here as `success = false` with a reason and, when the store is
/// unreachable, remediation text.
#[derive(Debug, Clone, Serialize)]
pub struct EnqueueOutcome {
    pub success: bool,
    pub job_id: Option<JobId>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl EnqueueOutcome {
    pub fn queued(job_id: JobId) -> Self {
        Self {
            success: true,
            job_id: Some(job_id),
            error: None,
            message: Some("notification queued for delivery".to_string()),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            job_id: None,
            error: Some(reason.into()),
            message: Some(
                "queue store is unreachable; verify the Redis host/port/credential \
                 or deliver directly via the fallback path"
                    .to_string(),
            ),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            job_id: None,
            error: Some(error.into()),
            message: None,
        }
    }

    /// The store was unreachable and the job was executed synchronously
    /// through the fallback path instead: delivered, but with no retry or
    /// durability behind it.
    pub fn delivered_directly() -> Self {
        Self {
            success: true,
            job_id: None,
            error: None,
            message: Some(
                "queue store unavailable; delivered directly without durability or retry"
                    .to_string(),
            ),
        }
    }
}

/// Structured result of a status lookup.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusReport {
    pub found: bool,
    pub id: Option<JobId>,
    pub kind: Option<String>,
    pub state: Option<JobState>,
    pub attempts: Option<u32>,
    pub max_attempts: Option<u32>,
    pub last_error: Option<String>,
    /// Set when the lookup itself failed (store unreachable); `found` is
    /// false in that case.
    pub error: Option<String>,
}

impl JobStatusReport {
    pub fn of(record: &JobRecord) -> Self {
        Self {
            found: true,
            id: Some(record.id),
            kind: Some(record.kind.clone()),
            state: Some(record.state),
            attempts: Some(record.attempts),
            max_attempts: Some(record.max_attempts),
            last_error: record.last_error.clone(),
            error: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            found: false,
            id: None,
            kind: None,
            state: None,
            attempts: None,
            max_attempts: None,
            last_error: None,
            error: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::not_found()
        }
    }
}

/// Aggregate queue counts for operational visibility.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct QueueCounts {
    pub waiting: u64,
    pub active: u64,
    pub delayed: u64,
    pub completed: u64,
    pub failed: u64,
    pub paused: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_round_trip() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_job_state_display() {
        assert_eq!(JobState::Waiting.to_string(), "waiting");
        assert_eq!(JobState::Delayed.to_string(), "delayed");
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Active.is_terminal());
    }

    #[test]
    fn test_new_job_defaults() {
        let record = NewJob::new(
            "password-reset",
            "user@example.com",
            "Reset your password",
            serde_json::json!({"reset_url": "https://app.example.com/reset"}),
        )
        .into_record(5, BackoffStrategy::default());

        assert_eq!(record.state, JobState::Waiting);
        assert_eq!(record.attempts, 0);
        assert_eq!(record.max_attempts, 5);
        assert_eq!(record.scheduled_at, record.created_at);
        assert!(record.last_error.is_none());
    }

    #[test]
    fn test_new_job_with_delay_is_delayed() {
        let record = NewJob::new("magic-link", "user@example.com", "Your login link", serde_json::json!({}))
            .with_delay(Duration::from_secs(30))
            .into_record(5, BackoffStrategy::default());

        assert_eq!(record.state, JobState::Delayed);
        assert!(record.scheduled_at > record.created_at);
    }

    #[test]
    fn test_new_job_overrides() {
        let record = NewJob::new("admin-notification", "ops@example.com", "Alert", serde_json::json!({}))
            .with_max_attempts(2)
            .with_backoff(BackoffStrategy::Fixed { delay_secs: 1 })
            .into_record(5, BackoffStrategy::default());

        assert_eq!(record.max_attempts, 2);
        assert_eq!(record.backoff, BackoffStrategy::Fixed { delay_secs: 1 });
    }

    #[test]
    fn test_record_serialization_round_trip() {
        let record = NewJob::new("order-confirmation", "a@b.com", "Order", serde_json::json!({"order_id": "123"}))
            .into_record(5, BackoffStrategy::default());
        let json = serde_json::to_string(&record).unwrap();
        let parsed: JobRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, record.id);
        assert_eq!(parsed.kind, "order-confirmation");
        assert_eq!(parsed.state, JobState::Waiting);
    }

    #[test]
    fn test_enqueue_outcome_shapes() {
        let ok = EnqueueOutcome::queued(JobId::new());
        assert!(ok.success);
        assert!(ok.job_id.is_some());
        assert!(ok.error.is_none());

        let degraded = EnqueueOutcome::unavailable("connection refused");
        assert!(!degraded.success);
        assert!(degraded.error.is_some());
        assert!(degraded.message.as_deref().unwrap_or("").contains("unreachable"));
    }
}
