//! FIFO concurrency limiter.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::oneshot;

use crate::config::LimiterConfig;
use crate::events::LimiterEvent;
use rategate_core::DomainKey;

#[cfg(feature = "metrics")]
use metrics::gauge;

/// A caller blocked above the ceiling.
#[derive(Debug)]
struct Waiter {
    id: u64,
    grant: oneshot::Sender<()>,
}

#[derive(Debug, Default)]
struct LimiterState {
    active: usize,
    /// Ceiling passed to the most recent `acquire`.
    ceiling: usize,
    next_id: u64,
    waiters: VecDeque<Waiter>,
}

impl LimiterState {
    /// Hands slots to queued callers, front first, while the latest ceiling
    /// leaves room. A waiter that has gone away is skipped.
    fn dispatch(&mut self) {
        while !self.waiters.is_empty() && self.active < self.ceiling {
            let Some(waiter) = self.waiters.pop_front() else {
                break;
            };
            if waiter.grant.send(()).is_ok() {
                self.active += 1;
            }
        }
    }

    fn remove_waiter(&mut self, id: u64) {
        if let Some(pos) = self.waiters.iter().position(|w| w.id == id) {
            self.waiters.remove(pos);
        }
    }
}

struct Shared {
    config: LimiterConfig,
    state: Mutex<LimiterState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        let active = {
            let mut state = self.lock();
            state.active = state.active.saturating_sub(1);
            state.dispatch();
            self.record_gauges(&state);
            state.active
        };

        self.config.event_listeners.emit(&LimiterEvent::SlotReleased {
            domain: self.config.domain.clone(),
            timestamp: Instant::now(),
            active,
        });
    }

    #[allow(unused_variables)]
    fn record_gauges(&self, state: &LimiterState) {
        #[cfg(feature = "metrics")]
        {
            gauge!("rategate_active_requests", "domain" => self.config.domain.to_string())
                .set(state.active as f64);
            gauge!("rategate_queued_requests", "domain" => self.config.domain.to_string())
                .set(state.waiters.len() as f64);
        }
    }
}

/// Bounds the number of simultaneous in-flight calls for one domain.
///
/// Callers above the ceiling wait in strict arrival order. The ceiling is
/// passed to every [`acquire`](Self::acquire), so it can grow or shrink while
/// the limiter is in use. Queued callers are admitted against the ceiling
/// seen by the most recent `acquire`: after a shrink, releases drain the
/// active count down to the new ceiling before anyone else gets in.
///
/// Cloning yields another handle to the same limiter.
#[derive(Clone)]
pub struct ConcurrencyLimiter {
    shared: Arc<Shared>,
}

impl ConcurrencyLimiter {
    /// Creates a limiter for `domain` with no event listeners.
    pub fn new(domain: impl Into<DomainKey>) -> Self {
        LimiterConfig::builder().domain(domain).build()
    }

    pub(crate) fn with_config(config: LimiterConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(LimiterState::default()),
            }),
        }
    }

    /// The domain this limiter guards.
    pub fn domain(&self) -> &DomainKey {
        &self.shared.config.domain
    }

    /// Number of slots currently held.
    pub fn active(&self) -> usize {
        self.shared.lock().active
    }

    /// Number of callers waiting for a slot.
    pub fn queued(&self) -> usize {
        self.shared.lock().waiters.len()
    }

    /// Waits for a slot under a ceiling of `max_concurrent` (minimum one).
    ///
    /// The returned [`ConcurrencySlot`] releases the slot when dropped.
    /// Dropping this future while it waits removes the caller from the queue;
    /// if the slot was handed over in the meantime, it is passed on.
    pub async fn acquire(&self, max_concurrent: usize) -> ConcurrencySlot {
        let max_concurrent = max_concurrent.max(1);
        let started = tokio::time::Instant::now();

        loop {
            let (id, rx, queued) = {
                let mut state = self.shared.lock();
                state.ceiling = max_concurrent;
                if state.waiters.is_empty() && state.active < max_concurrent {
                    state.active += 1;
                    self.shared.record_gauges(&state);
                    let active = state.active;
                    drop(state);
                    return self.granted(active, started);
                }

                let (tx, rx) = oneshot::channel();
                let id = state.next_id;
                state.next_id += 1;
                state.waiters.push_back(Waiter { id, grant: tx });
                // a caller arriving with a raised ceiling may open room for the queue
                state.dispatch();
                self.shared.record_gauges(&state);
                (id, rx, state.waiters.len())
            };

            self.shared.config.event_listeners.emit(&LimiterEvent::SlotQueued {
                domain: self.shared.config.domain.clone(),
                timestamp: Instant::now(),
                queued,
            });

            #[cfg(feature = "tracing")]
            tracing::trace!(domain = %self.shared.config.domain, queued, "waiting for concurrency slot");

            let mut pending = PendingSlot {
                shared: self.shared.as_ref(),
                id,
                rx,
                settled: false,
            };
            if pending.wait().await {
                let active = self.shared.lock().active;
                return self.granted(active, started);
            }
        }
    }

    fn granted(&self, active: usize, started: tokio::time::Instant) -> ConcurrencySlot {
        self.shared.config.event_listeners.emit(&LimiterEvent::SlotAcquired {
            domain: self.shared.config.domain.clone(),
            timestamp: Instant::now(),
            active,
            waited: started.elapsed(),
        });
        ConcurrencySlot {
            shared: Some(Arc::clone(&self.shared)),
        }
    }
}

impl std::fmt::Debug for ConcurrencyLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("ConcurrencyLimiter")
            .field("domain", &self.shared.config.domain)
            .field("active", &state.active)
            .field("queued", &state.waiters.len())
            .finish()
    }
}

/// A queued acquisition. Cleans up its queue entry if dropped early.
struct PendingSlot<'a> {
    shared: &'a Shared,
    id: u64,
    rx: oneshot::Receiver<()>,
    settled: bool,
}

impl PendingSlot<'_> {
    /// Returns true once a slot has been handed over.
    async fn wait(&mut self) -> bool {
        let granted = (&mut self.rx).await.is_ok();
        self.settled = true;
        granted
    }
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        // checked under the lock so a concurrent hand-over cannot slip between
        let handed_over = {
            let mut state = self.shared.lock();
            match self.rx.try_recv() {
                Ok(()) => true,
                Err(_) => {
                    state.remove_waiter(self.id);
                    self.shared.record_gauges(&state);
                    false
                }
            }
        };
        if handed_over {
            self.shared.release();
        }
    }
}

/// A held concurrency slot. Returned to the limiter on drop.
#[must_use = "the slot is released as soon as it is dropped"]
pub struct ConcurrencySlot {
    shared: Option<Arc<Shared>>,
}

impl ConcurrencySlot {
    /// Releases the slot now.
    pub fn release(mut self) {
        if let Some(shared) = self.shared.take() {
            shared.release();
        }
    }
}

impl Drop for ConcurrencySlot {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.release();
        }
    }
}

impl std::fmt::Debug for ConcurrencySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencySlot")
            .field("held", &self.shared.is_some())
            .finish()
    }
}
