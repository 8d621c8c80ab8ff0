//! Exponential reconnect backoff.

use std::time::Duration;

/// Reconnect budget and delay schedule.
///
/// The delay before reconnect *n* (1-based) is `base_delay * 2^n`, so the
/// default schedule is 2s, 4s, 8s, 16s, 32s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    attempt: u32,
    max_attempts: u32,
    base_delay: Duration,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            base_delay,
        }
    }

    /// Reconnects made since the last successful connection.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another reconnect is allowed.
    pub fn can_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// Consume one reconnect and return its delay, or `None` once exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.can_retry() {
            return None;
        }
        self.attempt += 1;
        Some(self.delay_for(self.attempt))
    }

    /// Delay for a given attempt number. Saturates instead of overflowing.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(1000))
    }
}
