use crate::backoff::BackoffPolicy;
use crate::client::{ClientInner, DomainClient, MAX_RETRIES};
use crate::events::ClientEvent;
use crate::layer::DomainLayer;
use crate::registry::DomainGate;
use rategate_core::events::{EventListeners, FnListener};
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`DomainClient`] and [`DomainLayer`].
pub struct DomainClientBuilder {
    gate: DomainGate,
    max_retries: usize,
    backoff: BackoffPolicy,
    deadline: Option<Duration>,
    event_listeners: EventListeners<ClientEvent>,
}

impl DomainClientBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - max_retries: [`MAX_RETRIES`] (four attempts in total)
    /// - backoff: up to 1s of jitter
    /// - deadline: none
    pub fn new(gate: DomainGate) -> Self {
        Self {
            gate,
            max_retries: MAX_RETRIES,
            backoff: BackoffPolicy::default(),
            deadline: None,
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets how many times a request is retried after its first attempt.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the backoff used for transient failures.
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Bounds the end-to-end latency of each request, waits included.
    ///
    /// A request still running at the deadline fails with
    /// [`ClientError::DeadlineExceeded`](crate::ClientError::DeadlineExceeded).
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets or clears the deadline.
    pub fn deadline_opt(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Registers a callback when an attempt is sent.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - the zero-based attempt number.
    pub fn on_attempt<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ClientEvent::Attempt { attempt, .. } = event {
                f(*attempt);
            }
        }));
        self
    }

    /// Registers a callback when a retry is scheduled.
    ///
    /// # Callback Signature
    /// `Fn(usize, Duration)` - the zero-based attempt that failed, and the wait
    /// (cooldown or backoff) before the next one.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ClientEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback when the domain answers with a rate-limit status.
    pub fn on_rate_limited<F>(mut self, f: F) -> Self
    where
        F: Fn(u16) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ClientEvent::RateLimited { status, .. } = event {
                f(*status);
            }
        }));
        self
    }

    /// Registers a callback when a request succeeds.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - attempts it took.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ClientEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback when a request fails without retrying.
    ///
    /// # Callback Signature
    /// `Fn(Option<u16>)` - the status, or `None` for a transport error.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<u16>) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ClientEvent::Failed { status, .. } = event {
                f(*status);
            }
        }));
        self
    }

    /// Registers a callback when a request runs out of attempts.
    ///
    /// # Callback Signature
    /// `Fn(usize, u16)` - attempts made and the last status.
    pub fn on_retries_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, u16) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ClientEvent::RetriesExhausted {
                attempts,
                last_status,
                ..
            } = event
            {
                f(*attempts, *last_status);
            }
        }));
        self
    }

    /// Builds a layer that wraps transports into clients sharing these
    /// settings and this domain's gate.
    pub fn layer(self) -> DomainLayer {
        DomainLayer::from_inner(Arc::new(ClientInner {
            gate: self.gate,
            max_retries: self.max_retries,
            backoff: self.backoff,
            deadline: self.deadline,
            event_listeners: self.event_listeners,
        }))
    }

    /// Builds a client over `transport`.
    pub fn build<S>(self, transport: S) -> DomainClient<S> {
        self.layer().client(transport)
    }
}
