//! Start spacing, cooldown and adaptive delay tuning for one domain.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rategate_core::{AdaptiveConfig, DelayAdjustment, DomainKey};
use rategate_store::{DomainRateLimitConfig, SharedConfigStore};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::config::ThrottlerConfig;
use crate::events::ThrottlerEvent;

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// A caller queued for its start.
#[derive(Debug)]
struct StartWaiter {
    id: u64,
    /// Spacing in effect when this caller arrived.
    spacing: Duration,
    grant: oneshot::Sender<()>,
}

#[derive(Debug, Default)]
struct ThrottleState {
    last_start: Option<Instant>,
    rate_limited_until: Option<Instant>,
    consecutive_successes: u32,
    queue: VecDeque<StartWaiter>,
    next_id: u64,
    draining: bool,
}

impl ThrottleState {
    fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        self.rate_limited_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    fn remove_waiter(&mut self, id: u64) {
        if let Some(pos) = self.queue.iter().position(|w| w.id == id) {
            self.queue.remove(pos);
        }
    }
}

struct Shared {
    config: ThrottlerConfig,
    store: SharedConfigStore,
    state: Mutex<ThrottleState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ThrottleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[allow(unused_variables)]
    fn record_queue_gauge(&self, state: &ThrottleState) {
        #[cfg(feature = "metrics")]
        gauge!("rategate_start_queue_length", "domain" => self.config.domain.to_string())
            .set(state.queue.len() as f64);
    }

    fn emit(&self, event: ThrottlerEvent) {
        self.config.event_listeners.emit(&event);
    }
}

/// Tears down a drain that was dropped mid-sleep. Queued callers see their
/// grant channel close and re-enqueue under a fresh drain.
struct DrainGuard {
    shared: Arc<Shared>,
    finished: bool,
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = self.shared.lock();
        state.draining = false;
        state.queue.clear();
    }
}

/// The single start-queue drain for a domain.
///
/// Grants the front caller once both its spacing since the previous start and
/// any cooldown have elapsed, then moves to the next. Exits when the queue is
/// empty; the next caller to enqueue starts a new drain.
async fn drain(shared: Arc<Shared>) {
    let mut guard = DrainGuard {
        shared: Arc::clone(&shared),
        finished: false,
    };

    loop {
        let ready_at = {
            let mut state = shared.lock();
            while state.queue.front().is_some_and(|w| w.grant.is_closed()) {
                state.queue.pop_front();
            }
            let Some(front) = state.queue.front() else {
                state.draining = false;
                guard.finished = true;
                shared.record_queue_gauge(&state);
                return;
            };

            let now = Instant::now();
            let spaced = state.last_start.map(|last| last + front.spacing);
            match spaced.max(state.rate_limited_until) {
                Some(at) if at > now => at,
                _ => {
                    if let Some(waiter) = state.queue.pop_front() {
                        // a caller that left between the check and the send
                        // does not consume the start
                        if waiter.grant.send(()).is_ok() {
                            state.last_start = Some(now);
                        }
                    }
                    shared.record_queue_gauge(&state);
                    continue;
                }
            }
        };

        tokio::time::sleep_until(ready_at).await;
    }
}

/// A snapshot of a throttler's runtime state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlerStats {
    /// Callers waiting for their start.
    pub queued: usize,
    /// Successes since the last relaxation, rate limit or cooldown.
    pub consecutive_successes: u32,
    /// Time left in the current cooldown, if one is active.
    pub cooldown_remaining: Option<Duration>,
    /// Time since the last granted start.
    pub since_last_start: Option<Duration>,
}

/// Spaces request starts for one domain and runs its adaptive delay loop.
///
/// Starts are granted in arrival order, at least `requestDelayMs` apart, and
/// never while the domain is cooling down after a rate-limit rejection. The
/// spacing is taken from the [`DomainRateLimitConfig`] passed to
/// [`wait_to_start`](Self::wait_to_start), so a persisted adjustment applies
/// to the next caller that reads it.
///
/// Adaptive adjustments are written through the [`SharedConfigStore`].
/// Write failures are logged and reported as
/// [`ThrottlerEvent::PersistFailed`]; they never fail the caller.
///
/// Cloning yields another handle to the same throttler.
#[derive(Clone)]
pub struct RequestThrottler {
    shared: Arc<Shared>,
}

impl RequestThrottler {
    /// Creates a throttler for `domain` with no event listeners.
    pub fn new(domain: impl Into<DomainKey>, store: SharedConfigStore) -> Self {
        ThrottlerConfig::builder().domain(domain).build(store)
    }

    pub(crate) fn with_config(config: ThrottlerConfig, store: SharedConfigStore) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                store,
                state: Mutex::new(ThrottleState::default()),
            }),
        }
    }

    /// The domain this throttler paces.
    pub fn domain(&self) -> &DomainKey {
        &self.shared.config.domain
    }

    /// The store adaptive adjustments are written to.
    pub fn store(&self) -> &SharedConfigStore {
        &self.shared.store
    }

    /// Returns a snapshot of the runtime state.
    pub fn stats(&self) -> ThrottlerStats {
        let now = Instant::now();
        let state = self.shared.lock();
        ThrottlerStats {
            queued: state.queue.len(),
            consecutive_successes: state.consecutive_successes,
            cooldown_remaining: state.cooldown_remaining(now),
            since_last_start: state.last_start.map(|last| now.saturating_duration_since(last)),
        }
    }

    /// Time left in the current cooldown, if one is active.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        self.shared.lock().cooldown_remaining(Instant::now())
    }

    /// Waits until this caller may start a request.
    ///
    /// Sits out any active cooldown, then queues behind earlier callers. Each
    /// start is at least `config.request_delay()` after the previous one.
    ///
    /// Dropping the future gives up the caller's place in the queue.
    pub async fn wait_to_start(&self, config: &DomainRateLimitConfig) {
        let started = Instant::now();

        let cooldown = self.shared.lock().cooldown_remaining(started);
        if let Some(remaining) = cooldown {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                domain = %self.shared.config.domain,
                remaining_ms = remaining.as_millis() as u64,
                "waiting out rate-limit cooldown"
            );
            tokio::time::sleep(remaining).await;
        }

        loop {
            let (id, rx) = {
                let mut state = self.shared.lock();
                let (tx, rx) = oneshot::channel();
                let id = state.next_id;
                state.next_id += 1;
                state.queue.push_back(StartWaiter {
                    id,
                    spacing: config.request_delay(),
                    grant: tx,
                });
                if !state.draining {
                    state.draining = true;
                    tokio::spawn(drain(Arc::clone(&self.shared)));
                }
                self.shared.record_queue_gauge(&state);
                (id, rx)
            };

            let mut pending = PendingStart {
                shared: self.shared.as_ref(),
                id,
                rx,
                settled: false,
            };
            if pending.wait().await {
                break;
            }
        }

        let waited = started.elapsed();

        #[cfg(feature = "metrics")]
        counter!("rategate_throttle_starts_total", "domain" => self.shared.config.domain.to_string())
            .increment(1);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            domain = %self.shared.config.domain,
            waited_ms = waited.as_millis() as u64,
            "request start granted"
        );

        self.shared.emit(ThrottlerEvent::StartGranted {
            domain: self.shared.config.domain.clone(),
            timestamp: std::time::Instant::now(),
            waited,
        });
    }

    /// Freezes all starts for the domain for `config.rate_limit_cooldown()`
    /// and suspends the calling request for that full duration.
    pub async fn apply_rate_limit_cooldown(&self, config: &DomainRateLimitConfig) {
        let until = self.enter_cooldown(config);
        tokio::time::sleep_until(until).await;
    }

    /// Starts a cooldown without waiting for it. Returns when it ends.
    ///
    /// An already running cooldown that ends later is kept. Entering a
    /// cooldown also resets the success streak.
    pub fn enter_cooldown(&self, config: &DomainRateLimitConfig) -> Instant {
        let cooldown = config.rate_limit_cooldown();
        let until = Instant::now() + cooldown;
        {
            let mut state = self.shared.lock();
            state.rate_limited_until = state.rate_limited_until.max(Some(until));
            state.consecutive_successes = 0;
        }

        #[cfg(feature = "metrics")]
        counter!("rategate_cooldowns_total", "domain" => self.shared.config.domain.to_string())
            .increment(1);

        #[cfg(feature = "tracing")]
        tracing::warn!(
            domain = %self.shared.config.domain,
            cooldown_ms = config.rate_limit_cooldown_ms,
            "rate limited, cooling down"
        );

        self.shared.emit(ThrottlerEvent::CooldownEntered {
            domain: self.shared.config.domain.clone(),
            timestamp: std::time::Instant::now(),
            cooldown,
        });

        until
    }

    /// Counts a success. After `success_threshold` in a row, lowers the delay
    /// by `decrease_amount_ms` (never below the learned floor or the lower
    /// bound) and persists it.
    ///
    /// Does nothing unless `config.adaptive_enabled`. Returns the adjustment
    /// if the delay went down.
    pub async fn record_success(
        &self,
        config: &DomainRateLimitConfig,
        adaptive: &AdaptiveConfig,
    ) -> Option<DelayAdjustment> {
        if !config.adaptive_enabled {
            return None;
        }

        let due = {
            let mut state = self.shared.lock();
            state.consecutive_successes = state.consecutive_successes.saturating_add(1);
            if state.consecutive_successes >= adaptive.effective_success_threshold() {
                state.consecutive_successes = 0;
                true
            } else {
                false
            }
        };
        if !due {
            return None;
        }

        let adjustment = adaptive.relax(&config.delay_state())?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            domain = %self.shared.config.domain,
            from_ms = config.request_delay_ms,
            to_ms = adjustment.request_delay_ms,
            "relaxing request delay"
        );

        self.record_adjustment(adjustment, "decrease");
        self.shared.emit(ThrottlerEvent::DelayRelaxed {
            domain: self.shared.config.domain.clone(),
            timestamp: std::time::Instant::now(),
            from_ms: config.request_delay_ms,
            to_ms: adjustment.request_delay_ms,
        });
        self.persist(adjustment).await;
        Some(adjustment)
    }

    /// Reacts to a rate-limit rejection: raises the learned floor by
    /// `floor_step_ms`, multiplies it into the new delay and persists both.
    ///
    /// Resets the success streak in every case; the rest does nothing unless
    /// `config.adaptive_enabled`. Call it at most once per logical request.
    pub async fn record_rate_limit(
        &self,
        config: &DomainRateLimitConfig,
        adaptive: &AdaptiveConfig,
    ) -> Option<DelayAdjustment> {
        self.shared.lock().consecutive_successes = 0;
        if !config.adaptive_enabled {
            return None;
        }

        let adjustment = adaptive.penalize(&config.delay_state());

        #[cfg(feature = "tracing")]
        tracing::info!(
            domain = %self.shared.config.domain,
            from_ms = config.request_delay_ms,
            to_ms = adjustment.request_delay_ms,
            floor_ms = adjustment.learned_min_delay_ms,
            "raising request delay"
        );

        self.record_adjustment(adjustment, "increase");
        self.shared.emit(ThrottlerEvent::DelayPenalized {
            domain: self.shared.config.domain.clone(),
            timestamp: std::time::Instant::now(),
            from_ms: config.request_delay_ms,
            to_ms: adjustment.request_delay_ms,
            floor_ms: adjustment.learned_min_delay_ms,
        });
        self.persist(adjustment).await;
        Some(adjustment)
    }

    #[allow(unused_variables)]
    fn record_adjustment(&self, adjustment: DelayAdjustment, direction: &'static str) {
        #[cfg(feature = "metrics")]
        {
            let domain = self.shared.config.domain.to_string();
            counter!("rategate_adaptive_adjustments_total", "domain" => domain.clone(), "direction" => direction)
                .increment(1);
            gauge!("rategate_request_delay_ms", "domain" => domain)
                .set(adjustment.request_delay_ms as f64);
        }
    }

    async fn persist(&self, adjustment: DelayAdjustment) {
        let domain = &self.shared.config.domain;
        if let Err(error) = self.shared.store.write(domain, adjustment.into()).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(domain = %domain, error = %error, "failed to persist delay adjustment");

            self.shared.emit(ThrottlerEvent::PersistFailed {
                domain: domain.clone(),
                timestamp: std::time::Instant::now(),
                error: error.to_string(),
            });
        }
    }
}

impl std::fmt::Debug for RequestThrottler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestThrottler")
            .field("domain", &self.shared.config.domain)
            .field("stats", &self.stats())
            .finish()
    }
}

/// A queued start. Leaves the queue if dropped early.
struct PendingStart<'a> {
    shared: &'a Shared,
    id: u64,
    rx: oneshot::Receiver<()>,
    settled: bool,
}

impl PendingStart<'_> {
    /// Returns true once the start has been granted. False means the drain
    /// went away and the caller has to queue again.
    async fn wait(&mut self) -> bool {
        let granted = (&mut self.rx).await.is_ok();
        self.settled = true;
        granted
    }
}

impl Drop for PendingStart<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.shared.lock();
        state.remove_waiter(self.id);
        self.shared.record_queue_gauge(&state);
    }
}
