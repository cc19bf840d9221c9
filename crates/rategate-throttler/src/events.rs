//! Events emitted by the request throttler.

use rategate_core::{DomainEvent, DomainKey};
use std::time::{Duration, Instant};

/// Events emitted by a [`RequestThrottler`](crate::RequestThrottler).
#[derive(Debug, Clone)]
pub enum ThrottlerEvent {
    /// A caller was allowed to start its request.
    StartGranted {
        domain: DomainKey,
        timestamp: Instant,
        waited: Duration,
    },
    /// A rate-limit rejection froze all starts for the domain.
    CooldownEntered {
        domain: DomainKey,
        timestamp: Instant,
        cooldown: Duration,
    },
    /// A run of successes lowered the delay.
    DelayRelaxed {
        domain: DomainKey,
        timestamp: Instant,
        from_ms: u64,
        to_ms: u64,
    },
    /// A rate-limit rejection raised the floor and the delay.
    DelayPenalized {
        domain: DomainKey,
        timestamp: Instant,
        from_ms: u64,
        to_ms: u64,
        floor_ms: u64,
    },
    /// An adaptive adjustment could not be written to the store.
    PersistFailed {
        domain: DomainKey,
        timestamp: Instant,
        error: String,
    },
}

impl DomainEvent for ThrottlerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ThrottlerEvent::StartGranted { .. } => "start_granted",
            ThrottlerEvent::CooldownEntered { .. } => "cooldown_entered",
            ThrottlerEvent::DelayRelaxed { .. } => "delay_relaxed",
            ThrottlerEvent::DelayPenalized { .. } => "delay_penalized",
            ThrottlerEvent::PersistFailed { .. } => "persist_failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ThrottlerEvent::StartGranted { timestamp, .. }
            | ThrottlerEvent::CooldownEntered { timestamp, .. }
            | ThrottlerEvent::DelayRelaxed { timestamp, .. }
            | ThrottlerEvent::DelayPenalized { timestamp, .. }
            | ThrottlerEvent::PersistFailed { timestamp, .. } => *timestamp,
        }
    }

    fn domain(&self) -> &DomainKey {
        match self {
            ThrottlerEvent::StartGranted { domain, .. }
            | ThrottlerEvent::CooldownEntered { domain, .. }
            | ThrottlerEvent::DelayRelaxed { domain, .. }
            | ThrottlerEvent::DelayPenalized { domain, .. }
            | ThrottlerEvent::PersistFailed { domain, .. } => domain,
        }
    }
}
