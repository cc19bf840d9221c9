//! Events emitted by the concurrency limiter.

use rategate_core::{DomainEvent, DomainKey};
use std::time::{Duration, Instant};

/// Events emitted by a [`ConcurrencyLimiter`](crate::ConcurrencyLimiter).
#[derive(Debug, Clone)]
pub enum LimiterEvent {
    /// A caller obtained a slot.
    SlotAcquired {
        domain: DomainKey,
        timestamp: Instant,
        active: usize,
        waited: Duration,
    },
    /// A caller found the domain at its ceiling and joined the wait queue.
    SlotQueued {
        domain: DomainKey,
        timestamp: Instant,
        queued: usize,
    },
    /// A slot was returned.
    SlotReleased {
        domain: DomainKey,
        timestamp: Instant,
        active: usize,
    },
}

impl DomainEvent for LimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LimiterEvent::SlotAcquired { .. } => "slot_acquired",
            LimiterEvent::SlotQueued { .. } => "slot_queued",
            LimiterEvent::SlotReleased { .. } => "slot_released",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            LimiterEvent::SlotAcquired { timestamp, .. }
            | LimiterEvent::SlotQueued { timestamp, .. }
            | LimiterEvent::SlotReleased { timestamp, .. } => *timestamp,
        }
    }

    fn domain(&self) -> &DomainKey {
        match self {
            LimiterEvent::SlotAcquired { domain, .. }
            | LimiterEvent::SlotQueued { domain, .. }
            | LimiterEvent::SlotReleased { domain, .. } => domain,
        }
    }
}
