//! In-memory repositories shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use oracle::application::artifacts::ArtifactService;
use oracle::application::history::UserHistoryService;
use oracle::application::repos::{
    ArtifactQueryFilter, ArtifactsRepo, ArtifactsWriteRepo, CodingFeedbackRepo,
    CreateArtifactParams, RepoError, UserHistoryRepo,
};
use oracle::cache::{
    ArtifactViews, CacheConfig, CacheError, CacheTrigger, LruViewStore, ResilientViewCache,
    ViewCache, ViewKey,
};
use oracle::domain::entities::{
    ArtifactRecord, CodingFeedbackResponseRecord, NavigationChoiceRecord, ReferenceEdge,
    ReferenceSet, UserHistoryRecord,
};
use oracle::domain::references::ReferenceKind;
use oracle::domain::types::ArtifactType;

#[derive(Default)]
struct Tables {
    next_id: i64,
    artifacts: Vec<ArtifactRecord>,
    edges: Vec<ReferenceEdge>,
    choices: Vec<NavigationChoiceRecord>,
    histories: HashMap<i64, UserHistoryRecord>,
    feedback: Vec<CodingFeedbackResponseRecord>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Counts of repository calls, used to assert cache and batching behavior.
#[derive(Default)]
pub struct CallCounts {
    pub list_artifacts: AtomicUsize,
    pub find_by_ids: AtomicUsize,
    pub load_references: AtomicUsize,
}

impl CallCounts {
    pub fn lists(&self) -> usize {
        self.list_artifacts.load(Ordering::SeqCst)
    }

    pub fn reference_loads(&self) -> usize {
        self.load_references.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    pub calls: CallCounts,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn insert(&self, artifact_type: ArtifactType, title: &str) -> ArtifactRecord {
        let mut tables = self.tables.lock().await;
        let id = tables.allocate_id();
        let record = ArtifactRecord {
            id,
            guid: Uuid::new_v4(),
            artifact_type,
            content: format!("{title} body"),
            title: Some(title.to_string()),
            creator: None,
            creation_time: OffsetDateTime::UNIX_EPOCH,
            deprecated: false,
            in_line: false,
            boilerplate_code: None,
            topics: Vec::new(),
        };
        tables.artifacts.push(record.clone());
        record
    }

    pub async fn deprecate(&self, id: i64) {
        let mut tables = self.tables.lock().await;
        if let Some(record) = tables.artifacts.iter_mut().find(|record| record.id == id) {
            record.deprecated = true;
        }
    }

    pub async fn link(
        &self,
        kind: ReferenceKind,
        source: &ArtifactRecord,
        target: &ArtifactRecord,
        order: Option<i32>,
    ) {
        self.tables.lock().await.edges.push(ReferenceEdge {
            kind,
            source_id: source.id,
            target_id: target.id,
            target_guid: target.guid,
            order,
        });
    }

    pub async fn add_feedback_response(&self) -> CodingFeedbackResponseRecord {
        let mut tables = self.tables.lock().await;
        let id = tables.allocate_id();
        let record = CodingFeedbackResponseRecord {
            id,
            guid: Uuid::new_v4(),
        };
        tables.feedback.push(record.clone());
        record
    }

    pub async fn add_history(&self, artifact: &ArtifactRecord) -> UserHistoryRecord {
        let mut tables = self.tables.lock().await;
        let id = tables.allocate_id();
        let record = UserHistoryRecord {
            id,
            user_id: "learner".to_string(),
            session: "session-1".to_string(),
            artifact_id: artifact.id,
            user_artifact_id: None,
            coding_feedback_response_id: None,
        };
        tables.histories.insert(id, record.clone());
        record
    }

    pub async fn artifact_count(&self) -> usize {
        self.tables.lock().await.artifacts.len()
    }

    pub async fn edge_count(&self) -> usize {
        self.tables.lock().await.edges.len()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ArtifactsRepo for InMemoryStore {
    async fn find_by_guid(&self, guid: Uuid) -> Result<Option<ArtifactRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .artifacts
            .iter()
            .find(|record| record.guid == guid)
            .cloned())
    }

    async fn list_artifacts(
        &self,
        filter: &ArtifactQueryFilter,
    ) -> Result<Vec<ArtifactRecord>, RepoError> {
        self.calls.list_artifacts.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().await;
        Ok(tables
            .artifacts
            .iter()
            .filter(|record| filter.matches_record(record))
            .cloned()
            .collect())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<ArtifactRecord>, RepoError> {
        self.calls.find_by_ids.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().await;
        Ok(tables
            .artifacts
            .iter()
            .filter(|record| ids.contains(&record.id))
            .cloned()
            .collect())
    }

    async fn load_references(&self, ids: &[i64]) -> Result<ReferenceSet, RepoError> {
        self.calls.load_references.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().await;
        Ok(ReferenceSet {
            edges: tables
                .edges
                .iter()
                .filter(|edge| ids.contains(&edge.source_id))
                .cloned()
                .collect(),
            choices: tables
                .choices
                .iter()
                .filter(|choice| ids.contains(&choice.artifact_id))
                .cloned()
                .collect(),
        })
    }

    async fn find_ids_by_guids(&self, guids: &[Uuid]) -> Result<HashMap<Uuid, i64>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .artifacts
            .iter()
            .filter(|record| guids.contains(&record.guid))
            .map(|record| (record.guid, record.id))
            .collect())
    }
}

#[async_trait]
impl ArtifactsWriteRepo for InMemoryStore {
    async fn create_artifact(
        &self,
        params: CreateArtifactParams,
    ) -> Result<ArtifactRecord, RepoError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Integrity {
                message: "insert rejected".to_string(),
            });
        }

        let mut tables = self.tables.lock().await;
        let id = tables.allocate_id();
        let record = ArtifactRecord {
            id,
            guid: params.guid,
            artifact_type: params.artifact_type,
            content: params.content,
            title: params.title,
            creator: params.creator,
            creation_time: OffsetDateTime::now_utc(),
            deprecated: false,
            in_line: params.in_line,
            boilerplate_code: params.boilerplate_code.map(|reference| reference.guid),
            topics: params.topics,
        };

        for edge in params.edges {
            tables.edges.push(ReferenceEdge {
                kind: edge.kind,
                source_id: id,
                target_id: edge.target.id,
                target_guid: edge.target.guid,
                order: edge.order,
            });
        }
        for choice in params.choices {
            tables.choices.push(NavigationChoiceRecord {
                artifact_id: id,
                choice: choice.choice,
                order: choice.order,
                target_guid: choice.target.map(|reference| reference.guid),
            });
        }

        tables.artifacts.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl UserHistoryRepo for InMemoryStore {
    async fn find_history(&self, id: i64) -> Result<Option<UserHistoryRecord>, RepoError> {
        Ok(self.tables.lock().await.histories.get(&id).cloned())
    }

    async fn link_feedback_response(
        &self,
        history_id: i64,
        feedback_response_id: i64,
    ) -> Result<u64, RepoError> {
        let mut tables = self.tables.lock().await;
        match tables.histories.get_mut(&history_id) {
            Some(history) => {
                history.coding_feedback_response_id = Some(feedback_response_id);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[async_trait]
impl CodingFeedbackRepo for InMemoryStore {
    async fn find_response_by_guid(
        &self,
        guid: Uuid,
    ) -> Result<Option<CodingFeedbackResponseRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .feedback
            .iter()
            .find(|record| record.guid == guid)
            .cloned())
    }
}

pub fn cache_config(enabled: bool) -> CacheConfig {
    CacheConfig {
        enabled,
        depth_limit: 8,
    }
}

/// Services wired the same way the binary wires them.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub artifacts: Arc<ArtifactService>,
    pub history: Arc<UserHistoryService>,
    pub views: Option<Arc<LruViewStore>>,
}

pub fn harness(store: Arc<InMemoryStore>, cached: bool) -> Harness {
    if !cached {
        return wire(store, None);
    }
    let lru = Arc::new(LruViewStore::new(&cache_config(true)));
    let backend: Arc<dyn ViewCache> = lru.clone();
    let mut harness = wire(store, Some(backend));
    harness.views = Some(lru);
    harness
}

/// Wires the services over an arbitrary view cache backend.
pub fn harness_with_backend(store: Arc<InMemoryStore>, backend: Arc<dyn ViewCache>) -> Harness {
    wire(store, Some(backend))
}

fn wire(store: Arc<InMemoryStore>, backend: Option<Arc<dyn ViewCache>>) -> Harness {
    let config = cache_config(backend.is_some());
    let (resilient, trigger) = match backend {
        Some(backend) => {
            let resilient = ResilientViewCache::new(backend);
            let trigger = Arc::new(CacheTrigger::new(config.clone(), resilient.clone()));
            (Some(resilient), Some(trigger))
        }
        None => (None, None),
    };

    let artifacts = Arc::new(
        ArtifactService::new(store.clone(), store.clone())
            .with_view_cache_opt(resilient)
            .with_cache_trigger_opt(trigger.clone())
            .with_depth_limit(config.depth_limit),
    );
    let history = Arc::new(
        UserHistoryService::new(store.clone(), store.clone()).with_cache_trigger_opt(trigger),
    );

    Harness {
        store,
        artifacts,
        history,
        views: None,
    }
}

/// A view cache backend whose every call fails.
pub struct UnavailableViewCache;

#[async_trait]
impl ViewCache for UnavailableViewCache {
    async fn get(&self, _key: &ViewKey) -> Result<Option<ArtifactViews>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn put(&self, _key: ViewKey, _views: ArtifactViews) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn invalidate_namespace(&self, _namespace: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
}
