//! Queue configuration.

use crate::backoff::BackoffStrategy;
use core_config::redis::RedisConfig;
use core_config::{env_or_default, env_parse_or, ConfigError, FromEnv};
use std::time::Duration;

/// Configuration shared by the queue client, the store, and the worker pool.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Store connection parameters.
    pub redis: RedisConfig,
    /// Prefix for every store key.
    pub key_prefix: String,
    /// Hard ceiling on simultaneously executing handlers.
    pub concurrency: usize,
    /// Wait between claim attempts when the queue is empty or paused.
    pub poll_interval: Duration,
    /// Cadence of the delayed-job promoter.
    pub promote_interval: Duration,
    /// Cadence of the terminal-job evictor.
    pub evict_interval: Duration,
    /// Bound on the initial store connection attempt.
    pub connect_timeout: Duration,
    /// Bound on a single handler invocation; timeout counts as a transient
    /// failure.
    pub job_timeout: Duration,
    /// How long shutdown waits for in-flight jobs before giving up.
    pub shutdown_timeout: Duration,
    /// Default attempt ceiling, overridable per enqueue.
    pub default_max_attempts: u32,
    /// Default retry backoff, overridable per enqueue.
    pub default_backoff: BackoffStrategy,
    /// Retention window for completed jobs before eviction.
    pub completed_retention: Duration,
    /// Retention window for failed jobs before eviction.
    pub failed_retention: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            key_prefix: "courier".to_string(),
            concurrency: 5,
            poll_interval: Duration::from_millis(250),
            promote_interval: Duration::from_secs(1),
            evict_interval: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(5),
            job_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
            default_max_attempts: 5,
            default_backoff: BackoffStrategy::default(),
            completed_retention: Duration::from_secs(60 * 60),
            failed_retention: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl QueueConfig {
    pub fn with_redis(mut self, redis: RedisConfig) -> Self {
        self.redis = redis;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_promote_interval(mut self, interval: Duration) -> Self {
        self.promote_interval = interval;
        self
    }

    pub fn with_evict_interval(mut self, interval: Duration) -> Self {
        self.evict_interval = interval;
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn with_default_max_attempts(mut self, max_attempts: u32) -> Self {
        self.default_max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_default_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.default_backoff = backoff;
        self
    }

    pub fn with_retention(mut self, completed: Duration, failed: Duration) -> Self {
        self.completed_retention = completed;
        self.failed_retention = failed;
        self
    }
}

impl FromEnv for QueueConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            redis: RedisConfig::from_env()?,
            key_prefix: env_or_default("QUEUE_KEY_PREFIX", &defaults.key_prefix),
            concurrency: env_parse_or("QUEUE_CONCURRENCY", defaults.concurrency)?.max(1),
            poll_interval: Duration::from_millis(env_parse_or(
                "QUEUE_POLL_INTERVAL_MS",
                defaults.poll_interval.as_millis() as u64,
            )?),
            promote_interval: Duration::from_millis(env_parse_or(
                "QUEUE_PROMOTE_INTERVAL_MS",
                defaults.promote_interval.as_millis() as u64,
            )?),
            evict_interval: Duration::from_secs(env_parse_or(
                "QUEUE_EVICT_INTERVAL_SECS",
                defaults.evict_interval.as_secs(),
            )?),
            connect_timeout: Duration::from_secs(env_parse_or(
                "QUEUE_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout.as_secs(),
            )?),
            job_timeout: Duration::from_secs(env_parse_or(
                "QUEUE_JOB_TIMEOUT_SECS",
                defaults.job_timeout.as_secs(),
            )?),
            shutdown_timeout: Duration::from_secs(env_parse_or(
                "QUEUE_SHUTDOWN_TIMEOUT_SECS",
                defaults.shutdown_timeout.as_secs(),
            )?),
            default_max_attempts: env_parse_or("QUEUE_MAX_ATTEMPTS", defaults.default_max_attempts)?
                .max(1),
            default_backoff: BackoffStrategy::Exponential {
                base_secs: env_parse_or("QUEUE_BACKOFF_BASE_SECS", 2)?,
                cap_secs: env_parse_or("QUEUE_BACKOFF_CAP_SECS", 60)?,
            },
            completed_retention: Duration::from_secs(env_parse_or(
                "QUEUE_COMPLETED_RETENTION_SECS",
                defaults.completed_retention.as_secs(),
            )?),
            failed_retention: Duration::from_secs(env_parse_or(
                "QUEUE_FAILED_RETENTION_SECS",
                defaults.failed_retention.as_secs(),
            )?),
        })
    }
}
