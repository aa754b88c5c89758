//! Pure state-transition policy shared by every backend.
//!
//! Backends persist; this module decides. Keeping the retry policy here
//! means the Redis and in-memory stores cannot drift apart.

use super::FailOutcome;
use crate::job::{JobRecord, JobState};
use chrono::{DateTime, Utc};

/// Claimed → `active`.
pub fn claimed(job: &JobRecord, worker_id: &str, now: DateTime<Utc>) -> JobRecord {
    let mut next = job.clone();
    next.state = JobState::Active;
    next.started_at = Some(now);
    next.worker_id = Some(worker_id.to_string());
    next
}

/// Handler success → terminal `completed`.
pub fn completed(job: &JobRecord, now: DateTime<Utc>) -> JobRecord {
    let mut next = job.clone();
    next.state = JobState::Completed;
    next.finished_at = Some(now);
    next
}

/// Transient handler failure: increment attempts, then `delayed` with
/// backoff below the ceiling, terminal `failed` at it.
pub fn failed(job: &JobRecord, error: &str, now: DateTime<Utc>) -> (JobRecord, FailOutcome) {
    let attempts = job.attempts.saturating_add(1).min(job.max_attempts);
    let mut next = job.clone();
    next.attempts = attempts;
    next.last_error = Some(error.to_string());

    if attempts < job.max_attempts {
        let delay = job.backoff.delay_for(attempts);
        next.state = JobState::Delayed;
        next.scheduled_at = now + chrono::Duration::milliseconds(delay.as_millis() as i64);
        (next, FailOutcome::Retrying { attempts, delay })
    } else {
        next.state = JobState::Failed;
        next.finished_at = Some(now);
        (next, FailOutcome::Exhausted { attempts })
    }
}

/// Permanent failure: terminal `failed` on the spot, retry policy bypassed.
pub fn discarded(job: &JobRecord, error: &str, now: DateTime<Utc>) -> JobRecord {
    let mut next = job.clone();
    next.attempts = job.attempts.saturating_add(1).min(job.max_attempts);
    next.state = JobState::Failed;
    next.finished_at = Some(now);
    next.last_error = Some(error.to_string());
    next
}

/// Delayed job whose time has come → back to `waiting`.
pub fn promoted(job: &JobRecord) -> JobRecord {
    let mut next = job.clone();
    next.state = JobState::Waiting;
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::BackoffStrategy;
    use crate::job::NewJob;
    use std::time::Duration;

    fn record(max_attempts: u32) -> JobRecord {
        NewJob::new("magic-link", "user@example.com", "Login", serde_json::json!({}))
            .with_max_attempts(max_attempts)
            .into_record(5, BackoffStrategy::Exponential { base_secs: 2, cap_secs: 60 })
    }

    #[test]
    fn test_failure_below_ceiling_delays_with_backoff() {
        let job = record(3);
        let now = Utc::now();

        let (next, outcome) = failed(&job, "smtp 451", now);
        assert_eq!(next.state, JobState::Delayed);
        assert_eq!(next.attempts, 1);
        assert_eq!(next.last_error.as_deref(), Some("smtp 451"));
        assert_eq!(
            outcome,
            FailOutcome::Retrying { attempts: 1, delay: Duration::from_secs(2) }
        );
        // scheduled_at moved out by the backoff delay
        assert!(next.scheduled_at >= now + chrono::Duration::seconds(2));

        let (next, outcome) = failed(&next, "smtp 451", now);
        assert_eq!(
            outcome,
            FailOutcome::Retrying { attempts: 2, delay: Duration::from_secs(4) }
        );
        assert_eq!(next.attempts, 2);
    }

    #[test]
    fn test_failure_at_ceiling_goes_terminal() {
        let job = record(1);
        let (next, outcome) = failed(&job, "connection reset", Utc::now());

        assert_eq!(next.state, JobState::Failed);
        assert_eq!(next.attempts, 1);
        assert_eq!(outcome, FailOutcome::Exhausted { attempts: 1 });
        assert!(next.finished_at.is_some());
    }

    #[test]
    fn test_attempts_never_exceed_ceiling() {
        let mut job = record(2);
        job.attempts = 2;
        let (next, _) = failed(&job, "late failure", Utc::now());
        assert_eq!(next.attempts, 2);
    }

    #[test]
    fn test_discard_is_terminal_with_one_attempt() {
        let job = record(5);
        let next = discarded(&job, "no handler registered", Utc::now());

        assert_eq!(next.state, JobState::Failed);
        assert_eq!(next.attempts, 1);
        assert_eq!(next.last_error.as_deref(), Some("no handler registered"));
    }
}
