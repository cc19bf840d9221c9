//! JSON document store.
//!
//! All domains live in one document:
//!
//! ```json
//! {
//!   "adaptive": { "increaseMultiplier": 2.0, "floorStepMs": 100 },
//!   "domains": {
//!     "search-api": { "requestDelayMs": 400, "learnedMinDelayMs": 200 }
//!   }
//! }
//! ```
//!
//! Every field is optional; missing ones resolve to defaults at read time.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rategate_core::{AdaptiveConfig, DomainKey};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    DomainDefaults, DomainRateLimitConfig, RateLimitConfigStore, RateLimitConfigUpdate,
    StoreResult,
};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigDocument {
    adaptive: AdaptiveConfig,
    domains: BTreeMap<DomainKey, RateLimitConfigUpdate>,
}

/// Configuration store backed by a single JSON file.
///
/// Writes go through a temp file and a rename, so a crash mid-write leaves the
/// previous document intact. Writers in this process are serialized; there is
/// no cross-process locking.
#[derive(Debug)]
pub struct JsonFileConfigStore {
    path: PathBuf,
    defaults: DomainDefaults,
    write_lock: Mutex<()>,
}

impl JsonFileConfigStore {
    /// Create a store for the document at `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>, defaults: DomainDefaults) -> Self {
        Self {
            path: path.into(),
            defaults,
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StoreResult<ConfigDocument> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(ConfigDocument::default()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                #[cfg(feature = "tracing")]
                tracing::debug!(path = %self.path.display(), "config document missing, using defaults");
                Ok(ConfigDocument::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, document: &ConfigDocument) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let encoded = serde_json::to_vec_pretty(document)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, encoded).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Load-modify-save under the writer lock.
    async fn update<F>(&self, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut ConfigDocument) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load().await?;
        f(&mut document);
        self.save(&document).await
    }
}

#[async_trait]
impl RateLimitConfigStore for JsonFileConfigStore {
    async fn read(&self, domain: &DomainKey) -> StoreResult<DomainRateLimitConfig> {
        let document = self.load().await?;
        Ok(self.defaults.resolve(domain, document.domains.get(domain)))
    }

    async fn write(&self, domain: &DomainKey, update: RateLimitConfigUpdate) -> StoreResult<()> {
        self.update(|document| {
            document
                .domains
                .entry(domain.clone())
                .or_default()
                .merge(&update);
        })
        .await
    }

    async fn read_adaptive(&self) -> StoreResult<AdaptiveConfig> {
        Ok(self.load().await?.adaptive)
    }

    async fn write_adaptive(&self, config: AdaptiveConfig) -> StoreResult<()> {
        self.update(|document| document.adaptive = config).await
    }

    async fn domains(&self) -> StoreResult<Vec<DomainKey>> {
        let document = self.load().await?;
        let mut keys: Vec<DomainKey> = document.domains.into_keys().collect();
        for key in self.defaults.known_domains() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
