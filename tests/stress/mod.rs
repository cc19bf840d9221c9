//! Stress tests for rategate
//!
//! ## What We Test
//!
//! - **High volume**: thousands of logical requests through one domain
//! - **Many domains**: hundreds of gates created and driven concurrently
//! - **Churn**: callers cancelled while queued for slots and starts
//! - **State consistency**: ceilings hold and gates drain back to idle

pub mod isolation;
pub mod volume;

use futures::future::BoxFuture;
use rategate::{
    DomainDefaults, DomainRateLimitConfig, MemoryConfigStore, TransportError, TransportRequest,
    TransportResponse,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

/// Utility: Track peak concurrent operations
pub struct ConcurrencyTracker {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub fn enter(&self) {
        let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }
}

/// A store whose domains have no spacing and the given ceiling.
pub fn unpaced_store(max_concurrent_requests: usize) -> Arc<MemoryConfigStore> {
    Arc::new(MemoryConfigStore::new(DomainDefaults::new(
        DomainRateLimitConfig {
            request_delay_ms: 0,
            rate_limit_cooldown_ms: 50,
            max_concurrent_requests,
            ..DomainRateLimitConfig::default()
        },
    )))
}

/// A transport that sleeps for `work` and tracks concurrency.
#[derive(Clone)]
pub struct TrackedTransport {
    tracker: Arc<ConcurrencyTracker>,
    work: Duration,
}

impl TrackedTransport {
    pub fn new(tracker: Arc<ConcurrencyTracker>, work: Duration) -> Self {
        Self { tracker, work }
    }
}

impl Service<TransportRequest> for TrackedTransport {
    type Response = TransportResponse;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<TransportResponse, TransportError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), TransportError>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: TransportRequest) -> Self::Future {
        let tracker = Arc::clone(&self.tracker);
        let work = self.work;
        Box::pin(async move {
            tracker.enter();
            tokio::time::sleep(work).await;
            tracker.exit();
            Ok(TransportResponse::ok(req.path))
        })
    }
}
