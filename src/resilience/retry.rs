//! Retry policy with exponential backoff for recoverable errors
//!
//! Decides, per failed request, whether a retry is warranted and how long to
//! wait before the next attempt. Classification lives on the error type
//! itself (`DataError::is_retryable`): timeouts, transport failures and 5xx
//! responses retry; cancellation and 4xx never do.

use std::time::Duration;

use rand::Rng;

use crate::error::DataError;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt (0 disables retry)
    pub max_retries: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound on any single delay
    pub max_delay: Duration,

    /// Growth factor between attempts
    pub multiplier: f64,

    /// Jitter as a fraction of the computed delay (0.0-1.0).
    ///
    /// Must stay below `multiplier - 1` so delays remain strictly
    /// increasing across attempts.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Whether a failed attempt should be retried.
    ///
    /// `attempt` is zero-based: the initial call is attempt 0, so a policy
    /// with `max_retries = 3` allows attempts 0-3 (four calls total).
    pub fn should_retry(&self, error: &DataError, attempt: u32) -> bool {
        attempt < self.max_retries && error.is_retryable()
    }

    /// Delay to wait before re-issuing attempt `attempt + 1`.
    ///
    /// Grows exponentially from `base_delay`, with jitter proportional to
    /// the grown delay, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let jitter = if self.jitter > 0.0 {
            rand::thread_rng().gen_range(0.0..self.jitter) * exp
        } else {
            0.0
        };
        let delay = Duration::from_millis((exp + jitter) as u64);
        delay.min(self.max_delay)
    }

    /// Total number of transport calls this policy permits
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}
