//! Status classification.

/// Statuses that mean the domain is rejecting us for going too fast.
pub const RATE_LIMIT_STATUSES: [u16; 2] = [403, 429];

/// Statuses worth retrying after a backoff.
pub const TRANSIENT_STATUSES: [u16; 3] = [502, 503, 504];

/// How the client reacts to a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// 2xx. Counts towards relaxing the delay.
    Success,
    /// Cooldown, adaptive penalty, then retry.
    RateLimited,
    /// Exponential backoff, then retry.
    Transient,
    /// Returned to the caller as is.
    Fatal,
}

impl Outcome {
    /// Returns true if the client retries on this outcome.
    pub fn is_retryable(self) -> bool {
        matches!(self, Outcome::RateLimited | Outcome::Transient)
    }
}

/// Classifies a response status.
pub fn classify_status(status: u16) -> Outcome {
    if (200..300).contains(&status) {
        Outcome::Success
    } else if RATE_LIMIT_STATUSES.contains(&status) {
        Outcome::RateLimited
    } else if TRANSIENT_STATUSES.contains(&status) {
        Outcome::Transient
    } else {
        Outcome::Fatal
    }
}
