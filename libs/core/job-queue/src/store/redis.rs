//! Redis-backed [`JobStore`].
//!
//! Key layout under the configured prefix:
//! - `{p}:job:{id}` — hash holding the record JSON under `data`
//! - `{p}:wait` — list of job ids ready to claim (LPUSH in, LMOVE out)
//! - `{p}:active` — list of claimed job ids
//! - `{p}:delayed` — zset scored by eligibility epoch millis
//! - `{p}:completed` / `{p}:failed` — zsets scored by finish epoch millis,
//!   swept by the retention evictor
//! - `{p}:paused` — flag key
//!
//! Claim exclusivity is a single `LMOVE wait → active`: exactly one worker
//! receives a given id. Promotion claims each due id with `ZREM` before
//! re-listing it, so concurrent promoters cannot double-promote.

use super::{transitions, FailOutcome, JobStore};
use crate::config::QueueConfig;
use crate::error::{QueueError, Result};
use crate::job::{JobId, JobRecord, JobState, QueueCounts};
use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::debug;

const PROMOTE_BATCH: usize = 128;

pub struct RedisJobStore {
    conn: ConnectionManager,
    prefix: String,
    completed_retention: Duration,
    failed_retention: Duration,
}

impl RedisJobStore {
    /// Connect to the configured Redis instance, bounded by the connect
    /// timeout.
    pub async fn connect(config: &QueueConfig) -> Result<Self> {
        let client = redis::Client::open(config.redis.url().as_str())?;
        let conn = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                QueueError::Unavailable(format!(
                    "timed out connecting to redis at {}:{}",
                    config.redis.host, config.redis.port
                ))
            })??;

        debug!(
            host = %config.redis.host,
            port = %config.redis.port,
            prefix = %config.key_prefix,
            "Connected to queue store"
        );

        Ok(Self {
            conn,
            prefix: config.key_prefix.clone(),
            completed_retention: config.completed_retention,
            failed_retention: config.failed_retention,
        })
    }

    fn job_key(&self, id: &JobId) -> String {
        format!("{}:job:{}", self.prefix, id)
    }

    fn wait_key(&self) -> String {
        format!("{}:wait", self.prefix)
    }

    fn active_key(&self) -> String {
        format!("{}:active", self.prefix)
    }

    fn delayed_key(&self) -> String {
        format!("{}:delayed", self.prefix)
    }

    fn completed_key(&self) -> String {
        format!("{}:completed", self.prefix)
    }

    fn failed_key(&self) -> String {
        format!("{}:failed", self.prefix)
    }

    fn paused_key(&self) -> String {
        format!("{}:paused", self.prefix)
    }

    async fn read(&self, id: &JobId) -> Result<Option<JobRecord>> {
        let mut conn = self.conn.clone();
        let data: Option<String> = redis::cmd("HGET")
            .arg(self.job_key(id))
            .arg("data")
            .query_async(&mut conn)
            .await?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn write(&self, record: &JobRecord) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(record)?;
        redis::cmd("HSET")
            .arg(self.job_key(&record.id))
            .arg("data")
            .arg(json)
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    /// Remove a settled job from the active list and file it in the given
    /// terminal zset.
    async fn settle(&self, record: &JobRecord, terminal_key: String, at_ms: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        self.write(record).await?;
        redis::cmd("LREM")
            .arg(self.active_key())
            .arg(1)
            .arg(record.id.to_string())
            .query_async::<()>(&mut conn)
            .await?;
        redis::cmd("ZADD")
            .arg(terminal_key)
            .arg(at_ms)
            .arg(record.id.to_string())
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn evict_bucket(&self, key: String, retention: Duration) -> Result<usize> {
        let mut conn = self.conn.clone();
        let cutoff = Utc::now().timestamp_millis() - retention.as_millis() as i64;

        let expired: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(&key)
            .arg("-inf")
            .arg(cutoff)
            .query_async(&mut conn)
            .await?;

        for id in &expired {
            redis::cmd("DEL")
                .arg(format!("{}:job:{}", self.prefix, id))
                .query_async::<()>(&mut conn)
                .await?;
            redis::cmd("ZREM")
                .arg(&key)
                .arg(id)
                .query_async::<()>(&mut conn)
                .await?;
        }
        Ok(expired.len())
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn insert(&self, record: &JobRecord) -> Result<()> {
        let mut conn = self.conn.clone();
        self.write(record).await?;

        match record.state {
            JobState::Delayed => {
                redis::cmd("ZADD")
                    .arg(self.delayed_key())
                    .arg(record.scheduled_at.timestamp_millis())
                    .arg(record.id.to_string())
                    .query_async::<()>(&mut conn)
                    .await?;
            }
            _ => {
                redis::cmd("LPUSH")
                    .arg(self.wait_key())
                    .arg(record.id.to_string())
                    .query_async::<()>(&mut conn)
                    .await?;
            }
        }
        Ok(())
    }

    async fn claim(&self, worker_id: &str) -> Result<Option<JobRecord>> {
        let mut conn = self.conn.clone();

        // Single atomic handover: at most one worker sees this id.
        let id: Option<String> = redis::cmd("LMOVE")
            .arg(self.wait_key())
            .arg(self.active_key())
            .arg("RIGHT")
            .arg("LEFT")
            .query_async(&mut conn)
            .await?;

        let Some(id_str) = id else {
            return Ok(None);
        };
        let id: JobId = id_str
            .parse()
            .map_err(|_| QueueError::Corrupt(format!("invalid job id in wait list: {id_str}")))?;

        let Some(job) = self.read(&id).await? else {
            // Record gone (cancelled/evicted out of band); drop the orphan.
            redis::cmd("LREM")
                .arg(self.active_key())
                .arg(1)
                .arg(&id_str)
                .query_async::<()>(&mut conn)
                .await?;
            return Ok(None);
        };

        let next = transitions::claimed(&job, worker_id, Utc::now());
        self.write(&next).await?;
        Ok(Some(next))
    }

    async fn complete(&self, job: &JobRecord) -> Result<()> {
        let now = Utc::now();
        let next = transitions::completed(job, now);
        self.settle(&next, self.completed_key(), now.timestamp_millis())
            .await
    }

    async fn fail(&self, job: &JobRecord, error: &str) -> Result<FailOutcome> {
        let mut conn = self.conn.clone();
        let now = Utc::now();
        let (next, outcome) = transitions::failed(job, error, now);

        match outcome {
            FailOutcome::Retrying { .. } => {
                self.write(&next).await?;
                redis::cmd("LREM")
                    .arg(self.active_key())
                    .arg(1)
                    .arg(next.id.to_string())
                    .query_async::<()>(&mut conn)
                    .await?;
                redis::cmd("ZADD")
                    .arg(self.delayed_key())
                    .arg(next.scheduled_at.timestamp_millis())
                    .arg(next.id.to_string())
                    .query_async::<()>(&mut conn)
                    .await?;
            }
            FailOutcome::Exhausted { .. } => {
                self.settle(&next, self.failed_key(), now.timestamp_millis())
                    .await?;
            }
        }
        Ok(outcome)
    }

    async fn discard(&self, job: &JobRecord, error: &str) -> Result<()> {
        let now = Utc::now();
        let next = transitions::discarded(job, error, now);
        self.settle(&next, self.failed_key(), now.timestamp_millis())
            .await
    }

    async fn promote_due(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        let now_ms = Utc::now().timestamp_millis();

        let due: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(self.delayed_key())
            .arg("-inf")
            .arg(now_ms)
            .arg("LIMIT")
            .arg(0)
            .arg(PROMOTE_BATCH)
            .query_async(&mut conn)
            .await?;

        let mut moved = 0;
        for id_str in due {
            // ZREM is the promotion claim; a concurrent promoter that got
            // here first wins and we skip.
            let removed: i64 = redis::cmd("ZREM")
                .arg(self.delayed_key())
                .arg(&id_str)
                .query_async(&mut conn)
                .await?;
            if removed == 0 {
                continue;
            }

            if let Ok(id) = id_str.parse::<JobId>() {
                if let Some(job) = self.read(&id).await? {
                    self.write(&transitions::promoted(&job)).await?;
                }
            }
            redis::cmd("LPUSH")
                .arg(self.wait_key())
                .arg(&id_str)
                .query_async::<()>(&mut conn)
                .await?;
            moved += 1;
        }
        Ok(moved)
    }

    async fn evict_expired(&self) -> Result<usize> {
        let completed = self
            .evict_bucket(self.completed_key(), self.completed_retention)
            .await?;
        let failed = self
            .evict_bucket(self.failed_key(), self.failed_retention)
            .await?;
        Ok(completed + failed)
    }

    async fn fetch(&self, id: &JobId) -> Result<Option<JobRecord>> {
        self.read(id).await
    }

    async fn counts(&self) -> Result<QueueCounts> {
        let mut conn = self.conn.clone();

        let waiting: u64 = redis::cmd("LLEN")
            .arg(self.wait_key())
            .query_async(&mut conn)
            .await?;
        let active: u64 = redis::cmd("LLEN")
            .arg(self.active_key())
            .query_async(&mut conn)
            .await?;
        let delayed: u64 = redis::cmd("ZCARD")
            .arg(self.delayed_key())
            .query_async(&mut conn)
            .await?;
        let completed: u64 = redis::cmd("ZCARD")
            .arg(self.completed_key())
            .query_async(&mut conn)
            .await?;
        let failed: u64 = redis::cmd("ZCARD")
            .arg(self.failed_key())
            .query_async(&mut conn)
            .await?;
        let paused: bool = redis::cmd("EXISTS")
            .arg(self.paused_key())
            .query_async(&mut conn)
            .await?;

        Ok(QueueCounts {
            waiting,
            active,
            delayed,
            completed,
            failed,
            paused,
        })
    }

    async fn set_paused(&self, paused: bool) -> Result<()> {
        let mut conn = self.conn.clone();
        if paused {
            redis::cmd("SET")
                .arg(self.paused_key())
                .arg("1")
                .query_async::<()>(&mut conn)
                .await?;
        } else {
            redis::cmd("DEL")
                .arg(self.paused_key())
                .query_async::<()>(&mut conn)
                .await?;
        }
        Ok(())
    }

    async fn is_paused(&self) -> Result<bool> {
        let mut conn = self.conn.clone();
        let paused: bool = redis::cmd("EXISTS")
            .arg(self.paused_key())
            .query_async(&mut conn)
            .await?;
        Ok(paused)
    }

    async fn cancel(&self, id: &JobId) -> Result<bool> {
        let mut conn = self.conn.clone();
        let id_str = id.to_string();

        let from_wait: i64 = redis::cmd("LREM")
            .arg(self.wait_key())
            .arg(0)
            .arg(&id_str)
            .query_async(&mut conn)
            .await?;
        let from_delayed: i64 = redis::cmd("ZREM")
            .arg(self.delayed_key())
            .arg(&id_str)
            .query_async(&mut conn)
            .await?;

        if from_wait + from_delayed == 0 {
            return Ok(false);
        }

        redis::cmd("DEL")
            .arg(self.job_key(id))
            .query_async::<()>(&mut conn)
            .await?;
        Ok(true)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}
