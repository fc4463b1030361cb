//! Entry point for write paths to announce cache-affecting changes.

use std::time::Instant;

use metrics::histogram;
use tracing::{debug, info};
use uuid::Uuid;

use super::config::CacheConfig;
use super::keys::ARTIFACTS_NAMESPACE;
use super::store::ResilientViewCache;

const METRIC_CACHE_INVALIDATE_MS: &str = "oracle_cache_invalidate_ms";

/// Writes that change the artifact graph.
///
/// Every kind invalidates the whole artifacts namespace; the payload only
/// identifies the write in logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    ArtifactCreated { guid: Uuid },
    UserHistoryLinked { history_id: i64 },
}

/// Invalidates materialized views before the write path returns, so the next
/// read observes the change.
///
/// ```ignore
/// // After a successful artifact insert:
/// trigger.artifact_created(record.guid).await;
/// ```
pub struct CacheTrigger {
    config: CacheConfig,
    views: ResilientViewCache,
}

impl CacheTrigger {
    pub fn new(config: CacheConfig, views: ResilientViewCache) -> Self {
        Self { config, views }
    }

    pub async fn trigger(&self, kind: EventKind) {
        if !self.config.is_enabled() {
            debug!(event_kind = ?kind, "Cache trigger skipped: cache disabled");
            return;
        }

        let started = Instant::now();
        self.views.invalidate_namespace(ARTIFACTS_NAMESPACE).await;

        info!(
            event_kind = ?kind,
            namespace = ARTIFACTS_NAMESPACE,
            "Artifact views invalidated"
        );
        histogram!(METRIC_CACHE_INVALIDATE_MS).record(started.elapsed().as_secs_f64() * 1000.0);
    }

    pub async fn artifact_created(&self, guid: Uuid) {
        self.trigger(EventKind::ArtifactCreated { guid }).await;
    }

    pub async fn user_history_linked(&self, history_id: i64) {
        self.trigger(EventKind::UserHistoryLinked { history_id })
            .await;
    }
}
