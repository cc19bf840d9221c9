//! Per-domain configuration records.

use rategate_core::aimd::{DelayAdjustment, DelayState};
use rategate_core::DomainKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Persisted rate-limit settings for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRateLimitConfig {
    /// Current minimum spacing between request starts.
    pub request_delay_ms: u64,
    /// How long all starts are frozen after a rate-limit rejection.
    pub rate_limit_cooldown_ms: u64,
    /// Concurrency ceiling.
    pub max_concurrent_requests: usize,
    /// Whether the adaptive loop tunes `request_delay_ms`.
    pub adaptive_enabled: bool,
    /// Lower hard bound for adaptive tuning.
    pub min_request_delay_ms: u64,
    /// Upper hard bound for adaptive tuning.
    pub max_request_delay_ms: u64,
    /// Learned floor. Only ever ratchets upward.
    pub learned_min_delay_ms: u64,
}

impl Default for DomainRateLimitConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: 1_000,
            rate_limit_cooldown_ms: 30_000,
            max_concurrent_requests: 5,
            adaptive_enabled: true,
            min_request_delay_ms: 0,
            max_request_delay_ms: 30_000,
            learned_min_delay_ms: 0,
        }
    }
}

impl DomainRateLimitConfig {
    /// The minimum spacing between request starts.
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// The cooldown applied after a rate-limit rejection.
    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_millis(self.rate_limit_cooldown_ms)
    }

    /// Returns a copy with the invariants the runtime relies on restored.
    ///
    /// The concurrency ceiling is at least one, the tuning bounds are ordered,
    /// and the working delay is at least the learned floor while staying
    /// inside the bounds.
    pub fn normalized(mut self) -> Self {
        self.max_concurrent_requests = self.max_concurrent_requests.max(1);
        if self.min_request_delay_ms > self.max_request_delay_ms {
            std::mem::swap(&mut self.min_request_delay_ms, &mut self.max_request_delay_ms);
        }
        self.request_delay_ms = self
            .request_delay_ms
            .max(self.learned_min_delay_ms)
            .clamp(self.min_request_delay_ms, self.max_request_delay_ms);
        self
    }

    /// The delay fields the adaptive rules operate on.
    pub fn delay_state(&self) -> DelayState {
        DelayState {
            request_delay_ms: self.request_delay_ms,
            learned_min_delay_ms: self.learned_min_delay_ms,
            min_request_delay_ms: self.min_request_delay_ms,
            max_request_delay_ms: self.max_request_delay_ms,
        }
    }

    /// Applies a partial update in place.
    ///
    /// The working delay never ends up below the learned floor, so an update
    /// computed from an older read cannot undo a later penalty.
    pub fn apply(&mut self, update: &RateLimitConfigUpdate) {
        if let Some(v) = update.request_delay_ms {
            self.request_delay_ms = v;
        }
        if let Some(v) = update.rate_limit_cooldown_ms {
            self.rate_limit_cooldown_ms = v;
        }
        if let Some(v) = update.max_concurrent_requests {
            self.max_concurrent_requests = v;
        }
        if let Some(v) = update.adaptive_enabled {
            self.adaptive_enabled = v;
        }
        if let Some(v) = update.min_request_delay_ms {
            self.min_request_delay_ms = v;
        }
        if let Some(v) = update.max_request_delay_ms {
            self.max_request_delay_ms = v;
        }
        if let Some(v) = update.learned_min_delay_ms {
            // the floor never moves down
            self.learned_min_delay_ms = self.learned_min_delay_ms.max(v);
        }
        self.request_delay_ms = self.request_delay_ms.max(self.learned_min_delay_ms);
    }

    /// Returns a copy with `update` applied.
    pub fn with_update(mut self, update: &RateLimitConfigUpdate) -> Self {
        self.apply(update);
        self
    }
}

/// A partial write to a [`DomainRateLimitConfig`]. `None` fields are untouched.
///
/// Also the on-disk shape of a domain record, so records that predate a field
/// fall back to the default for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateLimitConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_cooldown_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_requests: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptive_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_request_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_request_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learned_min_delay_ms: Option<u64>,
}

impl RateLimitConfigUpdate {
    /// An update touching only the working delay and the learned floor.
    pub fn delays(request_delay_ms: u64, learned_min_delay_ms: u64) -> Self {
        Self {
            request_delay_ms: Some(request_delay_ms),
            learned_min_delay_ms: Some(learned_min_delay_ms),
            ..Self::default()
        }
    }

    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Layers `other` on top of `self`; fields set in `other` win.
    pub fn merge(&mut self, other: &RateLimitConfigUpdate) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field;
                })*
            };
        }
        take!(
            request_delay_ms,
            rate_limit_cooldown_ms,
            max_concurrent_requests,
            adaptive_enabled,
            min_request_delay_ms,
            max_request_delay_ms
        );
        if let Some(floor) = other.learned_min_delay_ms {
            self.learned_min_delay_ms = Some(self.learned_min_delay_ms.map_or(floor, |f| f.max(floor)));
        }
        if let (Some(delay), Some(floor)) = (self.request_delay_ms, self.learned_min_delay_ms) {
            self.request_delay_ms = Some(delay.max(floor));
        }
    }
}

impl From<DelayAdjustment> for RateLimitConfigUpdate {
    fn from(adjustment: DelayAdjustment) -> Self {
        Self::delays(adjustment.request_delay_ms, adjustment.learned_min_delay_ms)
    }
}

impl From<&DomainRateLimitConfig> for RateLimitConfigUpdate {
    fn from(config: &DomainRateLimitConfig) -> Self {
        Self {
            request_delay_ms: Some(config.request_delay_ms),
            rate_limit_cooldown_ms: Some(config.rate_limit_cooldown_ms),
            max_concurrent_requests: Some(config.max_concurrent_requests),
            adaptive_enabled: Some(config.adaptive_enabled),
            min_request_delay_ms: Some(config.min_request_delay_ms),
            max_request_delay_ms: Some(config.max_request_delay_ms),
            learned_min_delay_ms: Some(config.learned_min_delay_ms),
        }
    }
}

/// Defaults used for domains (or fields) a store has no record of.
#[derive(Debug, Clone, Default)]
pub struct DomainDefaults {
    fallback: DomainRateLimitConfig,
    per_domain: HashMap<DomainKey, DomainRateLimitConfig>,
}

impl DomainDefaults {
    /// Defaults that use `fallback` for every domain.
    pub fn new(fallback: DomainRateLimitConfig) -> Self {
        Self {
            fallback,
            per_domain: HashMap::new(),
        }
    }

    /// Registers defaults for one known domain.
    pub fn with_domain(
        mut self,
        domain: impl Into<DomainKey>,
        config: DomainRateLimitConfig,
    ) -> Self {
        self.per_domain.insert(domain.into(), config);
        self
    }

    /// The defaults for `domain`.
    pub fn for_domain(&self, domain: &DomainKey) -> &DomainRateLimitConfig {
        self.per_domain.get(domain).unwrap_or(&self.fallback)
    }

    /// Domains with registered defaults.
    pub fn known_domains(&self) -> impl Iterator<Item = &DomainKey> {
        self.per_domain.keys()
    }

    /// Resolves a stored record against the defaults for `domain`.
    pub fn resolve(
        &self,
        domain: &DomainKey,
        record: Option<&RateLimitConfigUpdate>,
    ) -> DomainRateLimitConfig {
        let base = self.for_domain(domain).clone();
        match record {
            Some(record) => base.with_update(record).normalized(),
            None => base.normalized(),
        }
    }
}
