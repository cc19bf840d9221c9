//! Per-domain concurrency limiting.
//!
//! A [`ConcurrencyLimiter`] bounds how many calls to one external domain are
//! in flight at once. It is the bulkhead that keeps a saturated domain from
//! consuming capacity meant for another: every domain gets its own limiter and
//! limiters are never shared.
//!
//! Unlike a semaphore sized at construction, the ceiling is supplied on every
//! [`acquire`](ConcurrencyLimiter::acquire), because the configured value for
//! a domain may change while calls are running. Waiting callers are admitted in
//! arrival order.
//!
//! # Example
//!
//! ```rust
//! use rategate_limiter::ConcurrencyLimiter;
//!
//! # async fn example() {
//! let limiter = ConcurrencyLimiter::new("search-api");
//!
//! let slot = limiter.acquire(5).await;
//! assert_eq!(limiter.active(), 1);
//!
//! // ... issue the call ...
//!
//! drop(slot);
//! assert_eq!(limiter.active(), 0);
//! # }
//! ```
//!
//! # Cancellation
//!
//! Dropping a pending `acquire` future removes the caller from the queue, and
//! dropping a [`ConcurrencySlot`] returns the slot, so a call abandoned at any
//! point never strands capacity.

mod config;
mod events;
mod limiter;

pub use config::{LimiterConfig, LimiterConfigBuilder};
pub use events::LimiterEvent;
pub use limiter::{ConcurrencyLimiter, ConcurrencySlot};
