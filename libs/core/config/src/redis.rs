use crate::{env_or_default, env_parse_or, ConfigError, FromEnv};

/// Redis connection parameters.
///
/// Host, port, and an optional credential are supplied externally (env,
/// deployment manifest). `url()` assembles the connection string the redis
/// client expects.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

impl RedisConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Connection URL in `redis://[:password@]host:port` form.
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!("redis://:{}@{}:{}", password, self.host, self.port),
            None => format!("redis://{}:{}", self.host, self.port),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 6379)
    }
}

impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_or_default("REDIS_HOST", "127.0.0.1"),
            port: env_parse_or("REDIS_PORT", 6379)?,
            password: std::env::var("REDIS_PASSWORD").ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config_url() {
        let config = RedisConfig::new("redis.internal", 6380);
        assert_eq!(config.url(), "redis://redis.internal:6380");

        let config = config.with_password("s3cret");
        assert_eq!(config.url(), "redis://:s3cret@redis.internal:6380");
    }

    #[test]
    fn test_redis_config_from_env() {
        temp_env::with_vars(
            [
                ("REDIS_HOST", Some("queue-host")),
                ("REDIS_PORT", Some("7000")),
                ("REDIS_PASSWORD", Some("hunter2")),
            ],
            || {
                let config = RedisConfig::from_env().unwrap();
                assert_eq!(config.host, "queue-host");
                assert_eq!(config.port, 7000);
                assert_eq!(config.password.as_deref(), Some("hunter2"));
            },
        );
    }

    #[test]
    fn test_redis_config_from_env_defaults() {
        temp_env::with_vars_unset(["REDIS_HOST", "REDIS_PORT", "REDIS_PASSWORD"], || {
            let config = RedisConfig::from_env().unwrap();
            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.port, 6379);
            assert!(config.password.is_none());
        });
    }

    #[test]
    fn test_redis_config_from_env_bad_port() {
        temp_env::with_var("REDIS_PORT", Some("not-a-port"), || {
            assert!(RedisConfig::from_env().is_err());
        });
    }
}
