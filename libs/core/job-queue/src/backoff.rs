//! Retry backoff strategies.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay policy applied between failed attempts.
///
/// The strategy rides inside the job record, so jobs keep the policy they
/// were enqueued with even if defaults change later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// The same delay before every retry.
    Fixed { delay_secs: u64 },
    /// `base * 2^(k-1)` seconds before attempt k+1, capped at `cap_secs`.
    Exponential { base_secs: u64, cap_secs: u64 },
}

impl BackoffStrategy {
    /// Delay to wait after `attempt` executed attempts (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed { delay_secs } => Duration::from_secs(*delay_secs),
            BackoffStrategy::Exponential { base_secs, cap_secs } => {
                let shift = attempt.saturating_sub(1);
                let delay = base_secs
                    .saturating_mul(2u64.saturating_pow(shift))
                    .min(*cap_secs);
                Duration::from_secs(delay)
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Exponential {
            base_secs: 2,
            cap_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_growth() {
        let backoff = BackoffStrategy::Exponential {
            base_secs: 2,
            cap_secs: 60,
        };

        // 2s, 4s, 8s, 16s, ...
        assert_eq!(backoff.delay_for(1), Duration::from_secs(2));
        assert_eq!(backoff.delay_for(2), Duration::from_secs(4));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(8));
        assert_eq!(backoff.delay_for(4), Duration::from_secs(16));
    }

    #[test]
    fn test_exponential_cap() {
        let backoff = BackoffStrategy::Exponential {
            base_secs: 2,
            cap_secs: 60,
        };

        assert_eq!(backoff.delay_for(6), Duration::from_secs(60));
        assert_eq!(backoff.delay_for(30), Duration::from_secs(60));
        // Shift overflow saturates rather than wrapping
        assert_eq!(backoff.delay_for(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_fixed() {
        let backoff = BackoffStrategy::Fixed { delay_secs: 5 };
        assert_eq!(backoff.delay_for(1), Duration::from_secs(5));
        assert_eq!(backoff.delay_for(10), Duration::from_secs(5));
    }

    #[test]
    fn test_serialization_round_trip() {
        let backoff = BackoffStrategy::default();
        let json = serde_json::to_string(&backoff).unwrap();
        let parsed: BackoffStrategy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, backoff);
    }
}
