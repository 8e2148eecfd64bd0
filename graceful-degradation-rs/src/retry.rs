//! # Retry Policy
//!
//! Decides whether an agent failure is worth retrying and how long to wait
//! before each attempt. Exponential backoff, capped, without jitter.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a retry policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retries
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Growth factor between retries
    pub multiplier: f64,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Error substrings that mark a failure as transient
    pub transient_patterns: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&shared_types_rs::DegradationSettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &shared_types_rs::DegradationSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            multiplier: settings.backoff_multiplier,
            max_delay: Duration::from_millis(settings.max_delay_ms),
            transient_patterns: settings.transient_patterns.clone(),
        }
    }

    /// Creates a policy for failures that should never be retried
    pub fn never() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// True if the error text contains one of the transient patterns
    pub fn is_transient(&self, error: &str) -> bool {
        self.transient_patterns
            .iter()
            .any(|pattern| error.contains(pattern.as_str()))
    }

    /// Whether a failure qualifies for the retry path at all
    pub fn should_retry(&self, retryable: bool, error: &str) -> bool {
        self.max_retries > 0 && retryable && self.is_transient(error)
    }

    /// Delay before retry number `attempt` (zero based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;

        let backoff_ms = base_ms * self.multiplier.powi(attempt as i32);
        Duration::from_millis(backoff_ms.min(max_ms) as u64)
    }

    /// All delays a full retry run would wait through
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_retries).map(|attempt| self.backoff_for(attempt)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.schedule(),
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000),
            ]
        );
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(5), Duration::from_millis(30_000));
        assert_eq!(policy.backoff_for(20), Duration::from_millis(30_000));
    }

    #[test]
    fn test_transient_patterns() {
        let policy = RetryPolicy::default();
        assert!(policy.is_transient("provider returned rate_limit"));
        assert!(policy.is_transient("read ECONNRESET"));
        assert!(policy.is_transient("request timeout after 30s"));
        assert!(!policy.is_transient("invalid api key"));
        // Matching is case sensitive
        assert!(!policy.is_transient("econnreset"));
    }

    #[test]
    fn test_should_retry_requires_flag_and_pattern() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(true, "ETIMEDOUT"));
        assert!(!policy.should_retry(false, "ETIMEDOUT"));
        assert!(!policy.should_retry(true, "bad request"));
        assert!(!RetryPolicy::never().should_retry(true, "ETIMEDOUT"));
    }
}
