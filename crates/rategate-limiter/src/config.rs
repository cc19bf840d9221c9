//! Configuration for the concurrency limiter.

use crate::events::LimiterEvent;
use crate::ConcurrencyLimiter;
use rategate_core::events::{EventListeners, FnListener};
use rategate_core::DomainKey;
use std::time::Duration;

/// Configuration for a [`ConcurrencyLimiter`].
///
/// The ceiling itself is not part of the configuration: every
/// [`acquire`](ConcurrencyLimiter::acquire) passes the ceiling currently
/// configured for the domain.
#[derive(Clone)]
pub struct LimiterConfig {
    pub(crate) domain: DomainKey,
    pub(crate) event_listeners: EventListeners<LimiterEvent>,
}

impl LimiterConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> LimiterConfigBuilder {
        LimiterConfigBuilder::new()
    }
}

/// Builder for [`LimiterConfig`].
pub struct LimiterConfigBuilder {
    domain: DomainKey,
    event_listeners: EventListeners<LimiterEvent>,
}

impl LimiterConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            domain: DomainKey::new("<unnamed>"),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the domain this limiter guards.
    ///
    /// Default: `"<unnamed>"`
    pub fn domain(mut self, domain: impl Into<DomainKey>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Registers a callback when a caller obtains a slot.
    ///
    /// # Callback Signature
    /// `Fn(usize, Duration)` - the number of active requests including this one,
    /// and how long the caller waited in the queue.
    ///
    /// # Example
    /// ```rust,no_run
    /// use rategate_limiter::LimiterConfig;
    ///
    /// let limiter = LimiterConfig::builder()
    ///     .domain("search-api")
    ///     .on_slot_acquired(|active, waited| {
    ///         println!("{} active, waited {:?}", active, waited);
    ///     })
    ///     .build();
    /// ```
    pub fn on_slot_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let LimiterEvent::SlotAcquired { active, waited, .. } = event {
                f(*active, *waited);
            }
        }));
        self
    }

    /// Registers a callback when a caller has to queue for a slot.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - the queue length including this caller.
    pub fn on_slot_queued<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let LimiterEvent::SlotQueued { queued, .. } = event {
                f(*queued);
            }
        }));
        self
    }

    /// Registers a callback when a slot is returned.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - the number of active requests after the release (and after
    /// any queued caller was handed the slot).
    pub fn on_slot_released<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let LimiterEvent::SlotReleased { active, .. } = event {
                f(*active);
            }
        }));
        self
    }

    /// Builds the limiter.
    pub fn build(self) -> ConcurrencyLimiter {
        ConcurrencyLimiter::with_config(LimiterConfig {
            domain: self.domain,
            event_listeners: self.event_listeners,
        })
    }
}

impl Default for LimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
