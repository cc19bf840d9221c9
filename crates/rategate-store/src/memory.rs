//! In-memory configuration store for single-process operation.
//!
//! Fast, lock-based store. State is not persisted across restarts.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rategate_core::{AdaptiveConfig, DomainKey};
use tokio::sync::RwLock;

use crate::{
    DomainDefaults, DomainRateLimitConfig, RateLimitConfigStore, RateLimitConfigUpdate,
    StoreError, StoreResult,
};

/// In-memory rate-limit configuration store.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    records: RwLock<HashMap<DomainKey, RateLimitConfigUpdate>>,
    adaptive: RwLock<AdaptiveConfig>,
    defaults: DomainDefaults,
    unavailable: AtomicBool,
}

impl MemoryConfigStore {
    /// Create a store that resolves unknown domains against `defaults`.
    pub fn new(defaults: DomainDefaults) -> Self {
        Self {
            defaults,
            ..Self::default()
        }
    }

    /// Sets the global adaptive tuning record.
    pub fn with_adaptive(mut self, adaptive: AdaptiveConfig) -> Self {
        self.adaptive = RwLock::new(adaptive);
        self
    }

    /// Seeds the record for `domain`.
    pub fn with_config(mut self, domain: impl Into<DomainKey>, config: &DomainRateLimitConfig) -> Self {
        self.records
            .get_mut()
            .insert(domain.into(), RateLimitConfigUpdate::from(config));
        self
    }

    /// Makes every write fail with [`StoreError::Unavailable`] until reset.
    ///
    /// Reads keep working so callers can still make progress.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store marked unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RateLimitConfigStore for MemoryConfigStore {
    async fn read(&self, domain: &DomainKey) -> StoreResult<DomainRateLimitConfig> {
        let records = self.records.read().await;
        Ok(self.defaults.resolve(domain, records.get(domain)))
    }

    async fn write(&self, domain: &DomainKey, update: RateLimitConfigUpdate) -> StoreResult<()> {
        self.check_available()?;
        let mut records = self.records.write().await;
        records.entry(domain.clone()).or_default().merge(&update);
        Ok(())
    }

    async fn read_adaptive(&self) -> StoreResult<AdaptiveConfig> {
        Ok(self.adaptive.read().await.clone())
    }

    async fn write_adaptive(&self, config: AdaptiveConfig) -> StoreResult<()> {
        self.check_available()?;
        *self.adaptive.write().await = config;
        Ok(())
    }

    async fn domains(&self) -> StoreResult<Vec<DomainKey>> {
        let records = self.records.read().await;
        let keys: BTreeSet<DomainKey> = records
            .keys()
            .chain(self.defaults.known_domains())
            .cloned()
            .collect();
        Ok(keys.into_iter().collect())
    }
}
