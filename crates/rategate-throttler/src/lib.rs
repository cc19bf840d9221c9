//! Per-domain request start spacing with rate-limit cooldown and adaptive
//! delay tuning.
//!
//! A [`RequestThrottler`] guards the moment a request *starts*. Requests that
//! have started may overlap freely; bounding how many run at once is the job
//! of a concurrency limiter in front of the throttler.
//!
//! Three mechanisms work together:
//!
//! - **Start spacing**: starts are granted in arrival order and at least
//!   `requestDelayMs` apart. One drain task per domain hands out the starts.
//! - **Cooldown**: after a rate-limit rejection no start is granted for
//!   `rateLimitCooldownMs`. The caller that hit the rejection waits the whole
//!   cooldown itself.
//! - **Adaptive delay**: a run of successes lowers the delay linearly, a
//!   rejection raises the learned floor and multiplies the delay. Changes are
//!   written to the configuration store and picked up by the next caller.
//!
//! # Example
//!
//! ```rust
//! use rategate_store::{DomainRateLimitConfig, MemoryConfigStore, SharedConfigStore};
//! use rategate_throttler::RequestThrottler;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store: SharedConfigStore = Arc::new(MemoryConfigStore::default());
//! let throttler = RequestThrottler::new("search-api", store);
//!
//! let config = DomainRateLimitConfig {
//!     request_delay_ms: 0,
//!     ..DomainRateLimitConfig::default()
//! };
//! throttler.wait_to_start(&config).await;
//! // issue the request here
//! # }
//! ```
//!
//! # Cancellation
//!
//! Both waits in [`RequestThrottler::wait_to_start`] are cancellation safe.
//! Dropping the future while queued removes the caller from the start queue
//! without consuming a start.

mod config;
mod events;
mod throttler;

pub use config::{ThrottlerConfig, ThrottlerConfigBuilder};
pub use events::ThrottlerEvent;
pub use throttler::{RequestThrottler, ThrottlerStats};
