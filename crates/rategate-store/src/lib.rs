//! Durable per-domain rate-limit settings.
//!
//! Each domain has a small [`DomainRateLimitConfig`] record (current delay,
//! cooldown length, concurrency cap, adaptive bounds, learned floor) and all
//! domains share one [`AdaptiveConfig`] record of tuning constants. Records are
//! read fresh before every logical call and written back, best-effort, by the
//! adaptive loop.
//!
//! Two stores are provided:
//! - [`MemoryConfigStore`]: process-local, nothing survives a restart
//! - [`JsonFileConfigStore`]: a single JSON document on disk
//!
//! Both merge whatever they hold over per-domain defaults, so a domain that has
//! never been written (or a record written by an older release that lacks a
//! field) still reads as a complete config.
//!
//! # Example
//!
//! ```rust
//! use rategate_store::{
//!     DomainDefaults, DomainRateLimitConfig, MemoryConfigStore, RateLimitConfigStore,
//!     RateLimitConfigUpdate,
//! };
//! use rategate_core::DomainKey;
//!
//! # async fn example() -> Result<(), rategate_store::StoreError> {
//! let defaults = DomainDefaults::new(DomainRateLimitConfig::default()).with_domain(
//!     "search-api",
//!     DomainRateLimitConfig {
//!         request_delay_ms: 1_500,
//!         ..DomainRateLimitConfig::default()
//!     },
//! );
//! let store = MemoryConfigStore::new(defaults);
//! let domain = DomainKey::new("search-api");
//!
//! assert_eq!(store.read(&domain).await?.request_delay_ms, 1_500);
//!
//! store
//!     .write(&domain, RateLimitConfigUpdate::delays(800, 200))
//!     .await?;
//! assert_eq!(store.read(&domain).await?.request_delay_ms, 800);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod file;
mod memory;
mod store;

pub use config::{DomainDefaults, DomainRateLimitConfig, RateLimitConfigUpdate};
pub use error::{StoreError, StoreResult};
pub use file::JsonFileConfigStore;
pub use memory::MemoryConfigStore;
pub use store::{RateLimitConfigStore, SharedConfigStore};

pub use rategate_core::AdaptiveConfig;
