// src/collaborators/retry.rs
//! Retry/backoff schedule interface
//!
//! A real schedule combines exponential backoff, the consecutive rate-limit
//! streak, an explicit cooldown window, and any provider-supplied
//! retry-after hint. The engine never computes delays itself; it hands the
//! streak and hint to whichever schedule the host wired in.

use std::time::Duration;

/// Delay source for retried admission attempts
pub trait RetrySchedule: Send + Sync {
    /// Delay before the next attempt, given the current rate-limit streak
    /// and an optional provider retry-after hint
    fn delay_for(&self, consecutive_rate_limits: u32, retry_after_hint: Option<Duration>)
        -> Duration;
}

/// Default: honor the provider hint, otherwise a fixed base delay.
#[derive(Debug, Clone, Copy)]
pub struct FixedRetrySchedule {
    /// Delay used when the provider gave no hint
    pub base_delay: Duration,
}

impl Default for FixedRetrySchedule {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1_000),
        }
    }
}

impl RetrySchedule for FixedRetrySchedule {
    fn delay_for(
        &self,
        _consecutive_rate_limits: u32,
        retry_after_hint: Option<Duration>,
    ) -> Duration {
        retry_after_hint.unwrap_or(self.base_delay)
    }
}
