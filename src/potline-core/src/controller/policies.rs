// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Retry policies for operations against the line equipment.
//!
//! Network operations against PLCs fail transiently (cable hiccups, a busy
//! controller), so every remote call is repeated a bounded number of times
//! with a growing pause in between.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Policy for retrying failed operations.
pub trait RetryPolicy: Send + Sync {
    /// Determine if the operation should be retried after failing `attempt`
    /// (zero-based).
    fn should_retry(&self, attempt: u32, error: &BridgeError) -> bool;

    /// Get the delay before the attempt following `attempt`.
    fn delay(&self, attempt: u32) -> Duration;

    /// Get the maximum number of attempts allowed.
    fn max_attempts(&self) -> u32;
}

/// Linear backoff retry policy.
///
/// The pause after attempt `n` is `base_delay * (n + 1)`, capped at
/// `max_delay`.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl LinearBackoff {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Worst-case time spent sleeping when every attempt fails.
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|attempt| self.delay(attempt))
            .sum()
    }
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(10))
    }
}

impl RetryPolicy for LinearBackoff {
    fn should_retry(&self, attempt: u32, error: &BridgeError) -> bool {
        attempt + 1 < self.max_attempts && error.is_transient()
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(attempt.saturating_add(1))
            .min(self.max_delay)
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Exponential backoff retry policy.
///
/// Delays double with each retry attempt, up to a configured maximum delay.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl ExponentialBackoff {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn should_retry(&self, attempt: u32, error: &BridgeError) -> bool {
        attempt + 1 < self.max_attempts && error.is_transient()
    }

    fn delay(&self, attempt: u32) -> Duration {
        let multiplier = 2u32.saturating_pow(attempt);
        self.base_delay
            .saturating_mul(multiplier)
            .min(self.max_delay)
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Fixed delay retry policy.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    max_attempts: u32,
    delay: Duration,
}

impl FixedDelay {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl RetryPolicy for FixedDelay {
    fn should_retry(&self, attempt: u32, error: &BridgeError) -> bool {
        attempt + 1 < self.max_attempts && error.is_transient()
    }

    fn delay(&self, _attempt: u32) -> Duration {
        self.delay
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// No retry policy - fail immediately on first error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn should_retry(&self, _attempt: u32, _error: &BridgeError) -> bool {
        false
    }

    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }

    fn max_attempts(&self) -> u32 {
        1
    }
}

/// Shape of the pause between attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Linear,
    Exponential,
    Fixed,
    None,
}

/// Retry behaviour as configured in `[potline.retry]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per operation, including the first one
    pub attempts: u32,
    /// Base delay between attempts in milliseconds
    pub delay_ms: u64,
    /// Upper bound for a single delay in milliseconds
    pub max_delay_ms: u64,
    /// Backoff shape
    pub backoff: BackoffKind,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff: BackoffKind::Linear,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Check `attempts >= 1`, a non-zero base delay and a cap not below it.
    pub fn validate(&self) -> Result<(), String> {
        if self.attempts == 0 {
            return Err("[retry].attempts must be at least 1".into());
        }
        if self.delay_ms == 0 {
            return Err("[retry].delay_ms must be greater than 0".into());
        }
        if self.max_delay_ms < self.delay_ms {
            return Err(format!(
                "[retry].max_delay_ms ({}) must not be below delay_ms ({})",
                self.max_delay_ms, self.delay_ms
            ));
        }
        Ok(())
    }

    /// Build the configured policy.
    pub fn policy(&self) -> Arc<dyn RetryPolicy> {
        match self.backoff {
            BackoffKind::Linear => Arc::new(LinearBackoff::new(
                self.attempts,
                self.base_delay(),
                self.max_delay(),
            )),
            BackoffKind::Exponential => Arc::new(ExponentialBackoff::new(
                self.attempts,
                self.base_delay(),
                self.max_delay(),
            )),
            BackoffKind::Fixed => Arc::new(FixedDelay::new(self.attempts, self.base_delay())),
            BackoffKind::None => Arc::new(NoRetry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient() -> BridgeError {
        BridgeError::connection("opc.tcp://plc:4840", "refused")
    }

    #[test]
    fn test_linear_backoff_delays() {
        let policy = LinearBackoff::new(5, Duration::from_millis(100), Duration::from_millis(350));

        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(300));
        // Should cap at max_delay
        assert_eq!(policy.delay(3), Duration::from_millis(350));
        assert_eq!(policy.delay(10), Duration::from_millis(350));
    }

    #[test]
    fn test_linear_backoff_total() {
        let policy = LinearBackoff::new(3, Duration::from_millis(10), Duration::from_secs(1));
        assert_eq!(policy.total_backoff(), Duration::from_millis(30));

        let single = LinearBackoff::new(1, Duration::from_millis(10), Duration::from_secs(1));
        assert_eq!(single.total_backoff(), Duration::ZERO);
    }

    #[test]
    fn test_linear_backoff_should_retry() {
        let policy = LinearBackoff::new(3, Duration::from_millis(100), Duration::from_secs(1));

        assert!(policy.should_retry(0, &transient()));
        assert!(policy.should_retry(1, &transient()));
        assert!(!policy.should_retry(2, &transient())); // last attempt

        let fatal = BridgeError::namespace_not_found("urn:potline:lines", &[]);
        assert!(!policy.should_retry(0, &fatal));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let policy = LinearBackoff::new(0, Duration::from_millis(1), Duration::from_millis(1));
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_exponential_backoff_delays() {
        let policy = ExponentialBackoff::new(5, Duration::from_millis(100), Duration::from_secs(1));

        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
        assert_eq!(policy.delay(3), Duration::from_millis(800));
        assert_eq!(policy.delay(4), Duration::from_secs(1));
    }

    #[test]
    fn test_fixed_delay() {
        let policy = FixedDelay::new(3, Duration::from_millis(500));

        assert_eq!(policy.delay(0), Duration::from_millis(500));
        assert_eq!(policy.delay(5), Duration::from_millis(500));
    }

    #[test]
    fn test_no_retry() {
        let policy = NoRetry;
        assert!(!policy.should_retry(0, &transient()));
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.delay(0), Duration::ZERO);
    }

    #[test]
    fn test_retry_config_validation() {
        assert!(RetryConfig::default().validate().is_ok());

        let cfg = RetryConfig {
            attempts: 0,
            ..RetryConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = RetryConfig {
            delay_ms: 0,
            ..RetryConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = RetryConfig {
            delay_ms: 1000,
            max_delay_ms: 0,
            ..RetryConfig::default()
        };
        assert!(cfg.validate().unwrap_err().contains("max_delay_ms"));

        let cfg = RetryConfig {
            delay_ms: 500,
            max_delay_ms: 500,
            ..RetryConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_retry_config_builds_policy() {
        let cfg = RetryConfig {
            attempts: 4,
            delay_ms: 10,
            max_delay_ms: 25,
            backoff: BackoffKind::Linear,
        };
        let policy = cfg.policy();
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.delay(1), Duration::from_millis(20));
        assert_eq!(policy.delay(2), Duration::from_millis(25));

        let cfg = RetryConfig {
            backoff: BackoffKind::Fixed,
            ..cfg
        };
        assert_eq!(cfg.policy().delay(2), Duration::from_millis(10));

        let cfg = RetryConfig {
            backoff: BackoffKind::None,
            ..cfg
        };
        assert_eq!(cfg.policy().max_attempts(), 1);
    }

    #[test]
    fn test_parse_retry_config() {
        let cfg: RetryConfig = serde_json::from_str(r#"{"attempts":5,"backoff":"exponential"}"#)
            .unwrap();
        assert_eq!(cfg.attempts, 5);
        assert_eq!(cfg.delay_ms, 1000);
        assert_eq!(cfg.backoff, BackoffKind::Exponential);
    }
}
