//! Domain-isolated adaptive rate limiting and retries for outbound API calls.
//!
//! `rategate` mediates every call a program makes to a set of independently
//! rate-limited external APIs ("domains"). Each domain gets its own gate, so a
//! domain that is saturated or cooling down never slows down another.
//!
//! # Components
//!
//! - [`ConcurrencyLimiter`]: bounds in-flight calls per domain, FIFO
//! - [`RequestThrottler`]: spaces request starts, enforces cooldowns after
//!   rate-limit rejections and tunes the delay adaptively
//! - [`DomainClient`]: drives both for every attempt and retries rate-limited
//!   and transient failures
//! - [`RateLimitConfigStore`]: where per-domain settings and learned delays
//!   live ([`MemoryConfigStore`], [`JsonFileConfigStore`])
//! - [`DomainRegistry`]: owns one gate per domain and hands out clients
//!
//! # Example
//!
//! ```rust
//! use rategate::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = MemoryConfigStore::new(DomainDefaults::new(DomainRateLimitConfig {
//!     request_delay_ms: 0,
//!     ..DomainRateLimitConfig::default()
//! }));
//! let registry = DomainRegistry::builder(Arc::new(store))
//!     .on_delay_adjusted(|domain, from, to| println!("{domain}: {from}ms -> {to}ms"))
//!     .build();
//!
//! let transport = tower::service_fn(|req: TransportRequest| async move {
//!     Ok::<_, TransportError>(TransportResponse::ok(req.path))
//! });
//! let listings = registry.client("listings-api", transport);
//!
//! match listings.get("/v1/listings", [("q", "lamp")]).await {
//!     Ok(body) => println!("{body}"),
//!     Err(e) if e.is_retries_exhausted() => eprintln!("gave up: {e}"),
//!     Err(e) => eprintln!("failed: {e}"),
//! }
//! # }
//! ```
//!
//! # Durable configuration
//!
//! ```rust,no_run
//! use rategate::{DomainDefaults, JsonFileConfigStore, SharedConfigStore};
//! use std::sync::Arc;
//!
//! let store: SharedConfigStore = Arc::new(JsonFileConfigStore::new(
//!     "state/rate-limits.json",
//!     DomainDefaults::default(),
//! ));
//! ```
//!
//! Learned delays survive restarts: the next process starts from the delay
//! and floor the previous one settled on.
//!
//! # Feature Flags
//!
//! - `tracing` (default): structured logs through the `tracing` crate
//! - `metrics`: counters and gauges through the `metrics` crate
//!
//! See [`observability`] for the emitted log events and metric names.

pub mod observability;

pub use rategate_core as core;
pub use rategate_limiter as limiter;
pub use rategate_store as store;
pub use rategate_throttler as throttler;

pub use rategate_core::{AdaptiveConfig, DelayAdjustment, DomainKey};
pub use rategate_limiter::{ConcurrencyLimiter, ConcurrencySlot};
pub use rategate_store::{
    DomainDefaults, DomainRateLimitConfig, JsonFileConfigStore, MemoryConfigStore,
    RateLimitConfigStore, RateLimitConfigUpdate, SharedConfigStore, StoreError,
};
pub use rategate_throttler::{RequestThrottler, ThrottlerStats};

pub use rategate_client::{
    classify_status, BackoffPolicy, ClientError, ClientEvent, DomainClient, DomainClientBuilder,
    DomainGate, DomainLayer, DomainRegistry, DomainRegistryBuilder, DomainStats, Method, Outcome,
    TransportError, TransportRequest, TransportResponse, MAX_RETRIES, RATE_LIMIT_STATUSES,
    TRANSIENT_STATUSES,
};
pub use tokio_util::sync::CancellationToken;

/// The types most programs need.
pub mod prelude {
    pub use crate::{
        AdaptiveConfig, BackoffPolicy, CancellationToken, ClientError, DomainClient,
        DomainDefaults, DomainKey, DomainRateLimitConfig, DomainRegistry, MemoryConfigStore,
        RateLimitConfigStore, SharedConfigStore, TransportError, TransportRequest,
        TransportResponse,
    };
}
