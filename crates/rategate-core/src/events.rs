//! Observation hooks for per-domain components.
//!
//! The limiter, the throttler and the client each define an event enum and
//! hand every value of it to the [`EventListeners`] configured on their
//! builder. Listeners run inline on the task that caused the event, so they
//! should only record or forward what they see.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::DomainKey;

/// Something that happened to one domain's gate or client.
pub trait DomainEvent: Send + Sync + fmt::Debug {
    /// Short snake_case name, stable across releases (`"slot_queued"`,
    /// `"cooldown_entered"`, ...).
    fn event_type(&self) -> &'static str;

    /// Wall-clock instant the event was raised at.
    fn timestamp(&self) -> Instant;

    /// Domain the event concerns.
    fn domain(&self) -> &DomainKey;
}

/// Receives the events of one component.
pub trait EventListener<E: DomainEvent>: Send + Sync {
    fn on_event(&self, event: &E);
}

/// The listeners registered on a component's builder.
///
/// Cheap to clone; clones share the listeners.
#[derive(Clone)]
pub struct EventListeners<E: DomainEvent> {
    listeners: Vec<Arc<dyn EventListener<E>>>,
}

impl<E: DomainEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Registers `listener`. Listeners are called in registration order.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Delivers `event` to every listener.
    ///
    /// A listener that panics is skipped over; the panic never reaches the
    /// request that raised the event.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: DomainEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DomainEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// Adapts a closure into an [`EventListener`].
///
/// The builders' `on_*` methods wrap their callbacks in one of these, matching
/// on the variant they care about and ignoring the rest.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _event: std::marker::PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _event: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: DomainEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
