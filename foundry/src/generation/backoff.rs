//! Backoff policies for retried work.
//!
//! Delays are deterministic: the same policy and attempt number always
//! produce the same wait, so retry schedules can be asserted in tests.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * 2^attempt
    #[default]
    Exponential,
    /// delay = base * (attempt + 1)
    Linear,
    /// delay = base (constant)
    Constant,
}

/// A bounded retry schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Maximum attempts, including the first.
    pub max_attempts: usize,
    /// Base delay (one time unit).
    pub base: Duration,
    /// Cap on any single delay.
    pub max_delay: Duration,
    /// Growth strategy.
    pub strategy: BackoffStrategy,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            strategy: BackoffStrategy::Exponential,
        }
    }
}

impl BackoffPolicy {
    /// Exponential policy: attempt `n` waits `base * 2^n`.
    #[must_use]
    pub fn exponential(max_attempts: usize, base: Duration) -> Self {
        Self {
            max_attempts,
            base,
            ..Self::default()
        }
    }

    /// Fixed-delay policy.
    #[must_use]
    pub fn constant(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            base: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Constant,
        }
    }

    /// Sets the delay cap.
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay to wait after the given zero-based attempt fails.
    #[must_use]
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = match self.strategy {
            BackoffStrategy::Exponential => {
                2u32.saturating_pow(u32::try_from(attempt).unwrap_or(u32::MAX))
            }
            BackoffStrategy::Linear => u32::try_from(attempt + 1).unwrap_or(u32::MAX),
            BackoffStrategy::Constant => 1,
        };
        self.base.saturating_mul(factor).min(self.max_delay)
    }

    /// Returns true if another attempt is allowed after `attempts_made`.
    #[must_use]
    pub fn allows(&self, attempts_made: usize) -> bool {
        attempts_made < self.max_attempts
    }

    /// The full list of delays, one per attempt.
    #[must_use]
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_attempts).map(|a| self.delay_for(a)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_strategy_default() {
        assert_eq!(BackoffStrategy::default(), BackoffStrategy::Exponential);
    }

    #[test]
    fn test_exponential_schedule_in_units() {
        let policy = BackoffPolicy::exponential(3, Duration::from_secs(1));
        assert_eq!(
            policy.schedule(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[test]
    fn test_linear() {
        let policy = BackoffPolicy {
            strategy: BackoffStrategy::Linear,
            ..BackoffPolicy::exponential(3, Duration::from_millis(100))
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(300));
    }

    #[test]
    fn test_constant() {
        let policy = BackoffPolicy::constant(3, Duration::from_secs(300));
        assert_eq!(policy.delay_for(0), Duration::from_secs(300));
        assert_eq!(policy.delay_for(7), Duration::from_secs(300));
    }

    #[test]
    fn test_capped_at_max() {
        let policy = BackoffPolicy::exponential(20, Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5));
        assert_eq!(policy.delay_for(10), Duration::from_secs(5));
        assert_eq!(policy.delay_for(64), Duration::from_secs(5));
    }

    #[test]
    fn test_allows() {
        let policy = BackoffPolicy::exponential(2, Duration::from_millis(1));
        assert!(policy.allows(0));
        assert!(policy.allows(1));
        assert!(!policy.allows(2));
    }
}
