//! Materialized-view storage.
//!
//! `ViewCache` is the injected backend contract. `LruViewStore` is the
//! in-process default, and `ResilientViewCache` wraps any backend so that its
//! failures degrade to misses instead of failing requests.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::resolver::ArtifactView;

use super::config::CacheConfig;
use super::keys::ViewKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

const METRIC_VIEW_HIT: &str = "oracle_artifact_view_hit_total";
const METRIC_VIEW_MISS: &str = "oracle_artifact_view_miss_total";
const METRIC_VIEW_BACKEND_ERROR: &str = "oracle_artifact_view_backend_error_total";

/// A fully resolved artifact set, shared between the cache and readers.
pub type ArtifactViews = Arc<Vec<Arc<ArtifactView>>>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ViewCache: Send + Sync {
    async fn get(&self, key: &ViewKey) -> Result<Option<ArtifactViews>, CacheError>;

    async fn put(&self, key: ViewKey, views: ArtifactViews) -> Result<(), CacheError>;

    /// Drops every entry in `namespace`, whatever its depth.
    async fn invalidate_namespace(&self, namespace: &str) -> Result<(), CacheError>;
}

/// In-process LRU backend. Capacity is counted in depth entries.
pub struct LruViewStore {
    entries: RwLock<LruCache<ViewKey, ArtifactViews>>,
}

impl LruViewStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.depth_capacity())),
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ViewCache for LruViewStore {
    async fn get(&self, key: &ViewKey) -> Result<Option<ArtifactViews>, CacheError> {
        // LRU promotion mutates, so reads take the write lock.
        Ok(rw_write(&self.entries, SOURCE, "get").get(key).cloned())
    }

    async fn put(&self, key: ViewKey, views: ArtifactViews) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "put").put(key, views);
        Ok(())
    }

    async fn invalidate_namespace(&self, namespace: &str) -> Result<(), CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate_namespace");
        let stale: Vec<ViewKey> = entries
            .iter()
            .filter(|(key, _)| key.namespace == namespace)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        Ok(())
    }
}

/// Backend handle that never fails its caller.
#[derive(Clone)]
pub struct ResilientViewCache {
    backend: Arc<dyn ViewCache>,
}

impl ResilientViewCache {
    pub fn new(backend: Arc<dyn ViewCache>) -> Self {
        Self { backend }
    }

    /// Backend errors are reported as a miss.
    pub async fn get(&self, key: &ViewKey) -> Option<ArtifactViews> {
        match self.backend.get(key).await {
            Ok(Some(views)) => {
                counter!(METRIC_VIEW_HIT).increment(1);
                debug!(key = %key, count = views.len(), "Artifact view cache hit");
                Some(views)
            }
            Ok(None) => {
                counter!(METRIC_VIEW_MISS).increment(1);
                debug!(key = %key, "Artifact view cache miss");
                None
            }
            Err(err) => {
                backend_failure("get", key.to_string(), &err);
                counter!(METRIC_VIEW_MISS).increment(1);
                None
            }
        }
    }

    pub async fn put(&self, key: ViewKey, views: ArtifactViews) {
        let label = key.to_string();
        if let Err(err) = self.backend.put(key, views).await {
            backend_failure("put", label, &err);
        }
    }

    pub async fn invalidate_namespace(&self, namespace: &str) {
        if let Err(err) = self.backend.invalidate_namespace(namespace).await {
            backend_failure("invalidate_namespace", namespace.to_string(), &err);
        }
    }
}

fn backend_failure(op: &'static str, key: String, err: &CacheError) {
    counter!(METRIC_VIEW_BACKEND_ERROR, "op" => op).increment(1);
    warn!(
        target_module = SOURCE,
        op,
        key = %key,
        error = %err,
        "Artifact view cache backend failed; continuing without cache"
    );
}
