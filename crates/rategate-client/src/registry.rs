//! Per-domain gates and the registry that owns them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rategate_core::DomainKey;
use rategate_limiter::ConcurrencyLimiter;
use rategate_store::SharedConfigStore;
use rategate_throttler::{RequestThrottler, ThrottlerConfig};

use crate::backoff::BackoffPolicy;
use crate::client::{DomainClient, MAX_RETRIES};
use crate::config::DomainClientBuilder;

/// The limiter and throttler for one domain.
///
/// Cloning yields another handle to the same pair.
#[derive(Debug, Clone)]
pub struct DomainGate {
    domain: DomainKey,
    limiter: ConcurrencyLimiter,
    throttler: RequestThrottler,
}

impl DomainGate {
    /// Creates a fresh gate for `domain`.
    pub fn new(domain: impl Into<DomainKey>, store: SharedConfigStore) -> Self {
        let domain = domain.into();
        Self::from_parts(
            ConcurrencyLimiter::new(domain.clone()),
            RequestThrottler::new(domain, store),
        )
    }

    /// Assembles a gate from separately configured parts, for example ones
    /// built with event listeners. The domain is taken from the throttler.
    pub fn from_parts(limiter: ConcurrencyLimiter, throttler: RequestThrottler) -> Self {
        Self {
            domain: throttler.domain().clone(),
            limiter,
            throttler,
        }
    }

    /// The domain this gate isolates.
    pub fn domain(&self) -> &DomainKey {
        &self.domain
    }

    /// The domain's concurrency limiter.
    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// The domain's start throttler and adaptive delay loop.
    pub fn throttler(&self) -> &RequestThrottler {
        &self.throttler
    }

    /// The store the domain's configuration is read from and written to.
    pub fn store(&self) -> &SharedConfigStore {
        self.throttler.store()
    }

    /// Returns a snapshot of the gate's runtime state.
    pub fn stats(&self) -> DomainStats {
        let throttler = self.throttler.stats();
        DomainStats {
            domain: self.domain.clone(),
            active: self.limiter.active(),
            queued_for_slot: self.limiter.queued(),
            queued_for_start: throttler.queued,
            consecutive_successes: throttler.consecutive_successes,
            cooldown_remaining: throttler.cooldown_remaining,
        }
    }
}

/// Runtime state of one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainStats {
    /// The domain these figures belong to.
    pub domain: DomainKey,
    /// Requests holding a concurrency slot.
    pub active: usize,
    /// Requests waiting for a concurrency slot.
    pub queued_for_slot: usize,
    /// Requests holding a slot and waiting for their start.
    pub queued_for_start: usize,
    /// Successes since the delay was last relaxed or the domain was rate limited.
    pub consecutive_successes: u32,
    /// Time left before starts resume, if the domain is cooling down.
    pub cooldown_remaining: Option<Duration>,
}

type DelayHook = Arc<dyn Fn(&DomainKey, u64, u64) + Send + Sync>;
type CooldownHook = Arc<dyn Fn(&DomainKey, Duration) + Send + Sync>;

struct RegistryInner {
    store: SharedConfigStore,
    gates: Mutex<HashMap<DomainKey, DomainGate>>,
    max_retries: usize,
    backoff: BackoffPolicy,
    deadline: Option<Duration>,
    on_delay_adjusted: Option<DelayHook>,
    on_cooldown: Option<CooldownHook>,
}

/// Owns one [`DomainGate`] per domain for the life of the registry.
///
/// Gates are created on first use. Every client the registry hands out for a
/// domain goes through that domain's gate, and no gate is shared between
/// domains, so a saturated or cooling-down domain never holds up another.
///
/// Cloning yields another handle to the same registry.
///
/// # Example
///
/// ```
/// use rategate_client::{DomainRegistry, TransportError, TransportRequest, TransportResponse};
/// use rategate_store::MemoryConfigStore;
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let registry = DomainRegistry::new(Arc::new(MemoryConfigStore::default()));
/// let transport = tower::service_fn(|req: TransportRequest| async move {
///     Ok::<_, TransportError>(TransportResponse::ok(req.path))
/// });
///
/// let client = registry.client("search-api", transport);
/// let body = client.get("/v1/listings", [("q", "lamp")]).await.unwrap();
/// assert_eq!(body, "/v1/listings");
/// # }
/// ```
#[derive(Clone)]
pub struct DomainRegistry {
    inner: Arc<RegistryInner>,
}

impl DomainRegistry {
    /// Creates a registry with default client settings.
    pub fn new(store: SharedConfigStore) -> Self {
        DomainRegistryBuilder::new(store).build()
    }

    /// Creates a builder for a registry backed by `store`.
    pub fn builder(store: SharedConfigStore) -> DomainRegistryBuilder {
        DomainRegistryBuilder::new(store)
    }

    /// The store every gate in the registry reads and writes.
    pub fn store(&self) -> &SharedConfigStore {
        &self.inner.store
    }

    fn gates(&self) -> MutexGuard<'_, HashMap<DomainKey, DomainGate>> {
        self.inner
            .gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The gate for `domain`, created if this is its first use.
    pub fn gate(&self, domain: impl Into<DomainKey>) -> DomainGate {
        let domain = domain.into();
        self.gates()
            .entry(domain.clone())
            .or_insert_with(|| self.create_gate(domain))
            .clone()
    }

    fn create_gate(&self, domain: DomainKey) -> DomainGate {
        let mut throttler = ThrottlerConfig::builder().domain(domain.clone());
        if let Some(hook) = &self.inner.on_delay_adjusted {
            let hook = Arc::clone(hook);
            let key = domain.clone();
            throttler = throttler.on_delay_adjusted(move |from, to| hook(&key, from, to));
        }
        if let Some(hook) = &self.inner.on_cooldown {
            let hook = Arc::clone(hook);
            let key = domain.clone();
            throttler = throttler.on_cooldown(move |cooldown| hook(&key, cooldown));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(domain = %domain, "creating domain gate");

        DomainGate::from_parts(
            ConcurrencyLimiter::new(domain),
            throttler.build(Arc::clone(&self.inner.store)),
        )
    }

    /// A client builder for `domain`, pre-filled with the registry's settings.
    pub fn client_builder(&self, domain: impl Into<DomainKey>) -> DomainClientBuilder {
        DomainClientBuilder::new(self.gate(domain))
            .max_retries(self.inner.max_retries)
            .backoff(self.inner.backoff)
            .deadline_opt(self.inner.deadline)
    }

    /// A client for `domain` over `transport`.
    pub fn client<S>(&self, domain: impl Into<DomainKey>, transport: S) -> DomainClient<S> {
        self.client_builder(domain).build(transport)
    }

    /// Domains with a gate, sorted.
    pub fn domains(&self) -> Vec<DomainKey> {
        let mut domains: Vec<DomainKey> = self.gates().keys().cloned().collect();
        domains.sort();
        domains
    }

    /// Runtime state of every domain with a gate, sorted by domain.
    pub fn stats(&self) -> Vec<DomainStats> {
        let gates: Vec<DomainGate> = self.gates().values().cloned().collect();
        let mut stats: Vec<DomainStats> = gates.iter().map(DomainGate::stats).collect();
        stats.sort_by(|a, b| a.domain.cmp(&b.domain));
        stats
    }
}

impl std::fmt::Debug for DomainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainRegistry")
            .field("domains", &self.domains())
            .field("max_retries", &self.inner.max_retries)
            .finish()
    }
}

/// Builder for [`DomainRegistry`].
pub struct DomainRegistryBuilder {
    store: SharedConfigStore,
    max_retries: usize,
    backoff: BackoffPolicy,
    deadline: Option<Duration>,
    on_delay_adjusted: Option<DelayHook>,
    on_cooldown: Option<CooldownHook>,
}

impl DomainRegistryBuilder {
    pub fn new(store: SharedConfigStore) -> Self {
        Self {
            store,
            max_retries: MAX_RETRIES,
            backoff: BackoffPolicy::default(),
            deadline: None,
            on_delay_adjusted: None,
            on_cooldown: None,
        }
    }

    /// Retries per request for clients handed out by the registry.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Backoff for clients handed out by the registry.
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Per-request deadline for clients handed out by the registry.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Registers a callback when any domain's delay is adjusted.
    ///
    /// # Callback Signature
    /// `Fn(&DomainKey, u64, u64)` - the domain, the previous and the new delay
    /// in milliseconds.
    pub fn on_delay_adjusted<F>(mut self, f: F) -> Self
    where
        F: Fn(&DomainKey, u64, u64) + Send + Sync + 'static,
    {
        self.on_delay_adjusted = Some(Arc::new(f));
        self
    }

    /// Registers a callback when any domain enters a cooldown.
    pub fn on_cooldown<F>(mut self, f: F) -> Self
    where
        F: Fn(&DomainKey, Duration) + Send + Sync + 'static,
    {
        self.on_cooldown = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> DomainRegistry {
        DomainRegistry {
            inner: Arc::new(RegistryInner {
                store: self.store,
                gates: Mutex::new(HashMap::new()),
                max_retries: self.max_retries,
                backoff: self.backoff,
                deadline: self.deadline,
                on_delay_adjusted: self.on_delay_adjusted,
                on_cooldown: self.on_cooldown,
            }),
        }
    }
}
