use crate::events::ThrottlerEvent;
use crate::RequestThrottler;
use rategate_core::events::{EventListeners, FnListener};
use rategate_core::DomainKey;
use rategate_store::SharedConfigStore;
use std::time::Duration;

/// Configuration for a [`RequestThrottler`].
///
/// Delays and cooldown lengths are not part of it; they come from the domain's
/// [`DomainRateLimitConfig`](rategate_store::DomainRateLimitConfig), read fresh
/// by the caller for every logical request.
#[derive(Clone)]
pub struct ThrottlerConfig {
    pub(crate) domain: DomainKey,
    pub(crate) event_listeners: EventListeners<ThrottlerEvent>,
}

impl ThrottlerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ThrottlerConfigBuilder {
        ThrottlerConfigBuilder::new()
    }
}

/// Builder for [`ThrottlerConfig`].
pub struct ThrottlerConfigBuilder {
    domain: DomainKey,
    event_listeners: EventListeners<ThrottlerEvent>,
}

impl Default for ThrottlerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ThrottlerConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - domain: `"<unnamed>"`
    /// - no event listeners
    pub fn new() -> Self {
        Self {
            domain: DomainKey::new("<unnamed>"),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the domain this throttler paces. Also the key adaptive
    /// adjustments are written under.
    pub fn domain(mut self, domain: impl Into<DomainKey>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Registers a callback when a caller is allowed to start.
    ///
    /// # Callback Signature
    /// `Fn(Duration)` - how long the caller waited, cooldown included.
    pub fn on_start_granted<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ThrottlerEvent::StartGranted { waited, .. } = event {
                f(*waited);
            }
        }));
        self
    }

    /// Registers a callback when the domain enters a rate-limit cooldown.
    ///
    /// # Callback Signature
    /// `Fn(Duration)` - the cooldown length.
    pub fn on_cooldown<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ThrottlerEvent::CooldownEntered { cooldown, .. } = event {
                f(*cooldown);
            }
        }));
        self
    }

    /// Registers a callback when the adaptive loop changes the delay.
    ///
    /// # Callback Signature
    /// `Fn(u64, u64)` - the previous and the new delay in milliseconds.
    ///
    /// # Example
    /// ```rust,no_run
    /// use rategate_throttler::ThrottlerConfig;
    /// use rategate_store::{MemoryConfigStore, SharedConfigStore};
    /// use std::sync::Arc;
    ///
    /// let store: SharedConfigStore = Arc::new(MemoryConfigStore::default());
    /// let throttler = ThrottlerConfig::builder()
    ///     .domain("search-api")
    ///     .on_delay_adjusted(|from, to| {
    ///         println!("search-api delay {}ms -> {}ms", from, to);
    ///     })
    ///     .build(store);
    /// ```
    pub fn on_delay_adjusted<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| match event {
            ThrottlerEvent::DelayRelaxed { from_ms, to_ms, .. }
            | ThrottlerEvent::DelayPenalized { from_ms, to_ms, .. } => f(*from_ms, *to_ms),
            _ => {}
        }));
        self
    }

    /// Registers a callback when an adaptive adjustment fails to persist.
    ///
    /// The triggering request is not affected.
    pub fn on_persist_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ThrottlerEvent::PersistFailed { error, .. } = event {
                f(error);
            }
        }));
        self
    }

    /// Builds the throttler, writing adaptive adjustments to `store`.
    pub fn build(self, store: SharedConfigStore) -> RequestThrottler {
        RequestThrottler::with_config(
            ThrottlerConfig {
                domain: self.domain,
                event_listeners: self.event_listeners,
            },
            store,
        )
    }
}
