//! The store trait consumed by the throttling runtime.

use crate::{DomainRateLimitConfig, RateLimitConfigUpdate, StoreResult};
use async_trait::async_trait;
use rategate_core::{AdaptiveConfig, DomainKey};
use std::sync::Arc;

/// Shared handle to a store.
pub type SharedConfigStore = Arc<dyn RateLimitConfigStore>;

/// Durable per-domain settings plus the global adaptive tuning record.
///
/// Implementations must be thread-safe. Reads of unknown domains return
/// defaults rather than an error. Callers treat write failures as warnings, so
/// an implementation should fail fast instead of blocking.
#[async_trait]
pub trait RateLimitConfigStore: Send + Sync {
    /// Reads the current config for `domain`, merged over its defaults.
    async fn read(&self, domain: &DomainKey) -> StoreResult<DomainRateLimitConfig>;

    /// Applies a partial update to the record for `domain`.
    async fn write(&self, domain: &DomainKey, update: RateLimitConfigUpdate) -> StoreResult<()>;

    /// Reads the global adaptive tuning record.
    async fn read_adaptive(&self) -> StoreResult<AdaptiveConfig>;

    /// Replaces the global adaptive tuning record.
    async fn write_adaptive(&self, config: AdaptiveConfig) -> StoreResult<()>;

    /// Domains with a stored record or registered defaults.
    async fn domains(&self) -> StoreResult<Vec<DomainKey>>;
}
