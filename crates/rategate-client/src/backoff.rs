//! Backoff for transient failures.

use rand::Rng;
use std::time::Duration;

/// Exponential backoff on top of the domain's request delay, plus jitter.
///
/// The wait before the retry that follows attempt `n` (zero based) is
/// `request_delay * 2^n + uniform(0..=max_jitter)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_jitter: Duration::from_millis(1_000),
        }
    }
}

impl BackoffPolicy {
    /// Creates a policy with the given jitter ceiling.
    pub fn new(max_jitter: Duration) -> Self {
        Self { max_jitter }
    }

    /// A policy with no jitter, for deterministic waits.
    pub fn without_jitter() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn max_jitter(&self) -> Duration {
        self.max_jitter
    }

    /// The exponential part of the wait, saturating instead of overflowing.
    pub fn base_delay(&self, request_delay: Duration, attempt: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        request_delay.saturating_mul(factor)
    }

    /// The full wait before the next retry.
    pub fn delay(&self, request_delay: Duration, attempt: usize) -> Duration {
        let base = self.base_delay(request_delay, attempt);
        if self.max_jitter.is_zero() {
            return base;
        }
        let jitter_ms = rand::rng().random_range(0..=self.max_jitter.as_millis() as u64);
        base.saturating_add(Duration::from_millis(jitter_ms))
    }
}
