//! In-memory [`JobStore`] for development and testing.

use super::{transitions, FailOutcome, JobStore};
use crate::error::Result;
use crate::job::{JobId, JobRecord, JobState, QueueCounts};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, JobRecord>,
    wait: VecDeque<JobId>,
    active: Vec<JobId>,
    /// (eligible-at epoch ms, id)
    delayed: Vec<(i64, JobId)>,
    /// (finished-at epoch ms, id)
    completed: Vec<(i64, JobId)>,
    failed: Vec<(i64, JobId)>,
    paused: bool,
}

/// Non-durable backend with the same semantics as the Redis store. All
/// jobs are lost on restart.
pub struct MemoryJobStore {
    completed_retention: Duration,
    failed_retention: Duration,
    inner: Mutex<Inner>,
}

impl MemoryJobStore {
    pub fn new(completed_retention: Duration, failed_retention: Duration) -> Self {
        Self {
            completed_retention,
            failed_retention,
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600), Duration::from_secs(86400))
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, record: &JobRecord) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.jobs.insert(record.id, record.clone());
        match record.state {
            JobState::Delayed => {
                inner
                    .delayed
                    .push((record.scheduled_at.timestamp_millis(), record.id));
            }
            _ => inner.wait.push_back(record.id),
        }
        Ok(())
    }

    async fn claim(&self, worker_id: &str) -> Result<Option<JobRecord>> {
        let mut inner = self.inner.lock().await;
        let Some(id) = inner.wait.pop_front() else {
            return Ok(None);
        };

        let Some(job) = inner.jobs.get(&id).cloned() else {
            // Cancelled out from under its queue entry; skip the orphan id.
            return Ok(None);
        };

        let next = transitions::claimed(&job, worker_id, Utc::now());
        inner.jobs.insert(id, next.clone());
        inner.active.push(id);
        Ok(Some(next))
    }

    async fn complete(&self, job: &JobRecord) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let next = transitions::completed(job, now);
        inner.jobs.insert(job.id, next);
        inner.active.retain(|id| *id != job.id);
        inner.completed.push((now.timestamp_millis(), job.id));
        Ok(())
    }

    async fn fail(&self, job: &JobRecord, error: &str) -> Result<FailOutcome> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let (next, outcome) = transitions::failed(job, error, now);

        inner.active.retain(|id| *id != job.id);
        match outcome {
            FailOutcome::Retrying { .. } => {
                inner
                    .delayed
                    .push((next.scheduled_at.timestamp_millis(), job.id));
            }
            FailOutcome::Exhausted { .. } => {
                inner.failed.push((now.timestamp_millis(), job.id));
            }
        }
        inner.jobs.insert(job.id, next);
        Ok(outcome)
    }

    async fn discard(&self, job: &JobRecord, error: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let next = transitions::discarded(job, error, now);
        inner.jobs.insert(job.id, next);
        inner.active.retain(|id| *id != job.id);
        inner.failed.push((now.timestamp_millis(), job.id));
        Ok(())
    }

    async fn promote_due(&self) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        let now_ms = Utc::now().timestamp_millis();

        let due: Vec<JobId> = inner
            .delayed
            .iter()
            .filter(|(at, _)| *at <= now_ms)
            .map(|(_, id)| *id)
            .collect();
        inner.delayed.retain(|(at, _)| *at > now_ms);

        for id in &due {
            if let Some(job) = inner.jobs.get(id) {
                let next = transitions::promoted(job);
                inner.jobs.insert(*id, next);
            }
            inner.wait.push_back(*id);
        }
        Ok(due.len())
    }

    async fn evict_expired(&self) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        let now_ms = Utc::now().timestamp_millis();
        let mut evicted = 0;

        for (retention, terminal) in [
            (self.completed_retention, true),
            (self.failed_retention, false),
        ] {
            let cutoff = now_ms - retention.as_millis() as i64;
            let bucket = if terminal {
                &mut inner.completed
            } else {
                &mut inner.failed
            };
            let expired: Vec<JobId> = bucket
                .iter()
                .filter(|(at, _)| *at <= cutoff)
                .map(|(_, id)| *id)
                .collect();
            bucket.retain(|(at, _)| *at > cutoff);
            evicted += expired.len();
            for id in expired {
                inner.jobs.remove(&id);
            }
        }
        Ok(evicted)
    }

    async fn fetch(&self, id: &JobId) -> Result<Option<JobRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.jobs.get(id).cloned())
    }

    async fn counts(&self) -> Result<QueueCounts> {
        let inner = self.inner.lock().await;
        Ok(QueueCounts {
            waiting: inner.wait.len() as u64,
            active: inner.active.len() as u64,
            delayed: inner.delayed.len() as u64,
            completed: inner.completed.len() as u64,
            failed: inner.failed.len() as u64,
            paused: inner.paused,
        })
    }

    async fn set_paused(&self, paused: bool) -> Result<()> {
        self.inner.lock().await.paused = paused;
        Ok(())
    }

    async fn is_paused(&self) -> Result<bool> {
        Ok(self.inner.lock().await.paused)
    }

    async fn cancel(&self, id: &JobId) -> Result<bool> {
        let mut inner = self.inner.lock().await;

        let Some(job) = inner.jobs.get(id) else {
            return Ok(false);
        };
        if !matches!(job.state, JobState::Waiting | JobState::Delayed) {
            return Ok(false);
        }

        inner.wait.retain(|queued| queued != id);
        inner.delayed.retain(|(_, queued)| queued != id);
        inner.jobs.remove(id);
        Ok(true)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::BackoffStrategy;
    use crate::job::NewJob;

    fn store() -> MemoryJobStore {
        MemoryJobStore::default()
    }

    fn job() -> JobRecord {
        NewJob::new(
            "order-confirmation",
            "customer@example.com",
            "Your order is confirmed",
            serde_json::json!({"order_id": "ord_1"}),
        )
        .into_record(5, BackoffStrategy::default())
    }

    #[tokio::test]
    async fn test_insert_then_fetch_reports_waiting() {
        let store = store();
        let record = job();
        store.insert(&record).await.unwrap();

        let fetched = store.fetch(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched.state, JobState::Waiting);
        assert_eq!(fetched.attempts, 0);
    }

    #[tokio::test]
    async fn test_claim_is_exclusive() {
        let store = store();
        let record = job();
        store.insert(&record).await.unwrap();

        let first = store.claim("worker-a").await.unwrap();
        let second = store.claim("worker-b").await.unwrap();

        assert_eq!(first.unwrap().worker_id.as_deref(), Some("worker-a"));
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_delayed_job_not_claimable_until_promoted() {
        let store = store();
        let record = NewJob::new("magic-link", "u@example.com", "Login", serde_json::json!({}))
            .with_delay(Duration::from_millis(5))
            .into_record(5, BackoffStrategy::default());
        store.insert(&record).await.unwrap();

        assert!(store.claim("w").await.unwrap().is_none());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.promote_due().await.unwrap(), 1);

        let claimed = store.claim("w").await.unwrap().unwrap();
        assert_eq!(claimed.id, record.id);
        assert_eq!(claimed.state, JobState::Active);
    }

    #[tokio::test]
    async fn test_fail_then_exhaust() {
        let store = store();
        let record = NewJob::new("magic-link", "u@example.com", "Login", serde_json::json!({}))
            .with_max_attempts(2)
            .with_backoff(BackoffStrategy::Fixed { delay_secs: 0 })
            .into_record(5, BackoffStrategy::default());
        store.insert(&record).await.unwrap();

        let claimed = store.claim("w").await.unwrap().unwrap();
        let outcome = store.fail(&claimed, "451 try later").await.unwrap();
        assert!(matches!(outcome, FailOutcome::Retrying { attempts: 1, .. }));

        store.promote_due().await.unwrap();
        let claimed = store.claim("w").await.unwrap().unwrap();
        assert_eq!(claimed.attempts, 1);

        let outcome = store.fail(&claimed, "451 try later").await.unwrap();
        assert_eq!(outcome, FailOutcome::Exhausted { attempts: 2 });

        let settled = store.fetch(&record.id).await.unwrap().unwrap();
        assert_eq!(settled.state, JobState::Failed);
        assert_eq!(settled.attempts, 2);
        assert_eq!(settled.last_error.as_deref(), Some("451 try later"));
    }

    #[tokio::test]
    async fn test_eviction_respects_retention_windows() {
        // Completed evicts immediately, failed is retained.
        let store = MemoryJobStore::new(Duration::ZERO, Duration::from_secs(3600));

        let done = job();
        store.insert(&done).await.unwrap();
        let claimed = store.claim("w").await.unwrap().unwrap();
        store.complete(&claimed).await.unwrap();

        let dead = NewJob::new("magic-link", "u@example.com", "Login", serde_json::json!({}))
            .with_max_attempts(1)
            .into_record(5, BackoffStrategy::default());
        store.insert(&dead).await.unwrap();
        let claimed = store.claim("w").await.unwrap().unwrap();
        store.fail(&claimed, "boom").await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let evicted = store.evict_expired().await.unwrap();
        assert_eq!(evicted, 1);

        assert!(store.fetch(&done.id).await.unwrap().is_none());
        assert!(store.fetch(&dead.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cancel_only_touches_queued_jobs() {
        let store = store();

        let queued = job();
        store.insert(&queued).await.unwrap();
        assert!(store.cancel(&queued.id).await.unwrap());
        assert!(store.fetch(&queued.id).await.unwrap().is_none());
        // Its queue entry is gone too
        assert!(store.claim("w").await.unwrap().is_none());

        let running = job();
        store.insert(&running).await.unwrap();
        store.claim("w").await.unwrap().unwrap();
        assert!(!store.cancel(&running.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_counts_and_paused() {
        let store = store();
        store.insert(&job()).await.unwrap();
        store.insert(&job()).await.unwrap();
        store.set_paused(true).await.unwrap();

        let counts = store.counts().await.unwrap();
        assert_eq!(counts.waiting, 2);
        assert_eq!(counts.active, 0);
        assert!(counts.paused);
        assert!(store.is_paused().await.unwrap());
    }
}
