//! Events emitted by the domain client.

use rategate_core::{DomainEvent, DomainKey};
use std::time::{Duration, Instant};

/// Events emitted by a [`DomainClient`](crate::DomainClient) for each
/// logical request.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// An attempt was started (after slot and start were granted).
    Attempt {
        domain: DomainKey,
        timestamp: Instant,
        /// Zero based.
        attempt: usize,
    },
    /// The request succeeded.
    Success {
        domain: DomainKey,
        timestamp: Instant,
        attempts: usize,
    },
    /// The domain rejected an attempt with a rate-limit status.
    RateLimited {
        domain: DomainKey,
        timestamp: Instant,
        attempt: usize,
        status: u16,
    },
    /// A transient failure will be retried after `delay`.
    Retry {
        domain: DomainKey,
        timestamp: Instant,
        attempt: usize,
        status: u16,
        delay: Duration,
    },
    /// The request failed without retrying.
    Failed {
        domain: DomainKey,
        timestamp: Instant,
        attempts: usize,
        status: Option<u16>,
    },
    /// Every attempt failed with a retryable status.
    RetriesExhausted {
        domain: DomainKey,
        timestamp: Instant,
        attempts: usize,
        last_status: u16,
    },
}

impl DomainEvent for ClientEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::Attempt { .. } => "attempt",
            ClientEvent::Success { .. } => "success",
            ClientEvent::RateLimited { .. } => "rate_limited",
            ClientEvent::Retry { .. } => "retry",
            ClientEvent::Failed { .. } => "failed",
            ClientEvent::RetriesExhausted { .. } => "retries_exhausted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ClientEvent::Attempt { timestamp, .. }
            | ClientEvent::Success { timestamp, .. }
            | ClientEvent::RateLimited { timestamp, .. }
            | ClientEvent::Retry { timestamp, .. }
            | ClientEvent::Failed { timestamp, .. }
            | ClientEvent::RetriesExhausted { timestamp, .. } => *timestamp,
        }
    }

    fn domain(&self) -> &DomainKey {
        match self {
            ClientEvent::Attempt { domain, .. }
            | ClientEvent::Success { domain, .. }
            | ClientEvent::RateLimited { domain, .. }
            | ClientEvent::Retry { domain, .. }
            | ClientEvent::Failed { domain, .. }
            | ClientEvent::RetriesExhausted { domain, .. } => domain,
        }
    }
}
