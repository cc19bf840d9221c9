//! Domain-isolated retrying client.
//!
//! Every outbound call to a domain goes through that domain's
//! [`DomainGate`]: a [`ConcurrencyLimiter`](rategate_limiter::ConcurrencyLimiter)
//! bounding in-flight calls and a
//! [`RequestThrottler`](rategate_throttler::RequestThrottler) spacing their
//! starts. The [`DomainClient`] wraps a transport, drives the gate for each
//! attempt and decides what to do with the response:
//!
//! | Status | Outcome | Reaction |
//! |---|---|---|
//! | 2xx | [`Outcome::Success`] | record success, return body |
//! | 403, 429 | [`Outcome::RateLimited`] | penalize delay once, cooldown, retry |
//! | 502, 503, 504 | [`Outcome::Transient`] | exponential backoff, retry |
//! | anything else | [`Outcome::Fatal`] | fail immediately |
//!
//! A request makes at most [`MAX_RETRIES`] + 1 attempts before failing with
//! [`ClientError::RetriesExhausted`].
//!
//! # Transport
//!
//! A transport is a [`tower::Service`] taking a [`TransportRequest`] and
//! returning a [`TransportResponse`]. [`DomainLayer`] wraps one into a
//! [`DomainClient`], which is a `Service` itself and composes with other
//! tower middleware.
//!
//! # Example
//!
//! ```rust
//! use rategate_client::{DomainRegistry, TransportError, TransportRequest, TransportResponse};
//! use rategate_store::{DomainDefaults, DomainRateLimitConfig, MemoryConfigStore};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let defaults = DomainDefaults::new(DomainRateLimitConfig {
//!     request_delay_ms: 250,
//!     max_concurrent_requests: 2,
//!     ..DomainRateLimitConfig::default()
//! });
//! let registry = DomainRegistry::new(Arc::new(MemoryConfigStore::new(defaults)));
//!
//! let transport = tower::service_fn(|req: TransportRequest| async move {
//!     Ok::<_, TransportError>(TransportResponse::ok(format!("{} {}", req.method, req.path)))
//! });
//! let client = registry.client("search-api", transport);
//!
//! let body = client.get("/v1/listings", [("q", "lamp")]).await.unwrap();
//! assert_eq!(body, "GET /v1/listings");
//! # }
//! ```
//!
//! # Cancellation
//!
//! Dropping a request future releases its concurrency slot and its queue
//! positions. [`DomainClient::execute_with_cancel`] ties a request to a
//! [`CancellationToken`](tokio_util::sync::CancellationToken), and
//! [`DomainClientBuilder::deadline`] bounds the end-to-end latency.
//!
//! # Feature Flags
//!
//! - `tracing`: log attempts, retries, cooldowns and adaptive changes
//! - `metrics`: counters and gauges labelled by domain

mod backoff;
mod classify;
mod client;
mod config;
mod error;
mod events;
mod layer;
mod registry;
mod transport;

pub use backoff::BackoffPolicy;
pub use classify::{classify_status, Outcome, RATE_LIMIT_STATUSES, TRANSIENT_STATUSES};
pub use client::{DomainClient, MAX_RETRIES};
pub use config::DomainClientBuilder;
pub use error::ClientError;
pub use events::ClientEvent;
pub use layer::DomainLayer;
pub use registry::{DomainGate, DomainRegistry, DomainRegistryBuilder, DomainStats};
pub use transport::{Method, TransportError, TransportRequest, TransportResponse};
