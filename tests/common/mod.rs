//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::future::BoxFuture;
use rategate::store::StoreResult;
use rategate::{
    AdaptiveConfig, DomainKey, DomainRateLimitConfig, MemoryConfigStore, RateLimitConfigStore,
    RateLimitConfigUpdate, TransportError, TransportRequest, TransportResponse,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;
use tower::Service;

/// Routes the crates' logs to the test harness output. Safe to call from
/// every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("rategate_client=debug,rategate_throttler=debug,rategate_store=debug")
        .try_init();
}

/// Config with no start spacing and a short cooldown.
pub fn fast_config() -> DomainRateLimitConfig {
    DomainRateLimitConfig {
        request_delay_ms: 0,
        rate_limit_cooldown_ms: 100,
        ..DomainRateLimitConfig::default()
    }
}

/// A memory store seeded with `config` for each of `domains`.
pub fn store_with(domains: &[&str], config: &DomainRateLimitConfig) -> Arc<MemoryConfigStore> {
    let store = domains
        .iter()
        .fold(MemoryConfigStore::default(), |store, domain| {
            store.with_config(*domain, config)
        });
    Arc::new(store)
}

/// Transport answering each call with the next scripted status, repeating the
/// last one. Records call starts and peak concurrency.
#[derive(Clone)]
pub struct ScriptedTransport {
    statuses: Arc<Vec<u16>>,
    latency: Duration,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    starts: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptedTransport {
    pub fn new(statuses: &[u16]) -> Self {
        Self {
            statuses: Arc::new(statuses.to_vec()),
            latency: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            starts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always answers 200.
    pub fn ok() -> Self {
        Self::new(&[200])
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> Vec<Instant> {
        self.starts.lock().unwrap().clone()
    }
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Service<TransportRequest> for ScriptedTransport {
    type Response = TransportResponse;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<TransportResponse, TransportError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), TransportError>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: TransportRequest) -> Self::Future {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let status = self
            .statuses
            .get(n)
            .or(self.statuses.last())
            .copied()
            .unwrap_or(200);
        self.starts.lock().unwrap().push(Instant::now());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(Arc::clone(&self.in_flight));
        let latency = self.latency;

        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            drop(guard);
            Ok(TransportResponse::new(status, request.path))
        })
    }
}

/// A memory store whose writes take `latency` to land. Reads are immediate.
pub struct SlowWriteStore {
    inner: MemoryConfigStore,
    latency: Duration,
}

impl SlowWriteStore {
    pub fn new(inner: MemoryConfigStore, latency: Duration) -> Self {
        Self { inner, latency }
    }
}

#[async_trait]
impl RateLimitConfigStore for SlowWriteStore {
    async fn read(&self, domain: &DomainKey) -> StoreResult<DomainRateLimitConfig> {
        self.inner.read(domain).await
    }

    async fn write(&self, domain: &DomainKey, update: RateLimitConfigUpdate) -> StoreResult<()> {
        tokio::time::sleep(self.latency).await;
        self.inner.write(domain, update).await
    }

    async fn read_adaptive(&self) -> StoreResult<AdaptiveConfig> {
        self.inner.read_adaptive().await
    }

    async fn write_adaptive(&self, config: AdaptiveConfig) -> StoreResult<()> {
        self.inner.write_adaptive(config).await
    }

    async fn domains(&self) -> StoreResult<Vec<DomainKey>> {
        self.inner.domains().await
    }
}
