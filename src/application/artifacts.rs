use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::paging::{self, ArtifactListQuery, Page};
use crate::application::repos::{
    ArtifactQueryFilter, ArtifactsRepo, ArtifactsWriteRepo, CreateArtifactParams,
    NewNavigationChoice, NewReferenceEdge, RepoError, ResolvedReference, non_blank,
};
use crate::application::resolver::{ArtifactView, ReferenceResolver, ResolveError};
use crate::cache::{CacheTrigger, ResilientViewCache, ViewKey};
use crate::domain::error::DomainError;
use crate::domain::references::{EdgeOrdering, REFERENCE_POLICIES, ReferenceKind};
use crate::domain::types::ArtifactType;

#[derive(Debug, Error)]
pub enum ArtifactServiceError {
    #[error("Artifact with guid {0} not found, no artifact with that guid exists.")]
    ReferenceNotFound(String),
    #[error("artifact violates a store constraint")]
    ConstraintViolation(#[source] RepoError),
    #[error("artifact not found")]
    NotFound,
    #[error("requested depth {requested} exceeds the maximum supported depth of {limit}")]
    DepthLimitExceeded { requested: u32, limit: u32 },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateChoiceCommand {
    pub title: String,
    pub order: i32,
    pub artifact_id: Option<String>,
}

/// A create request with references still in their wire form.
#[derive(Debug, Clone)]
pub struct CreateArtifactCommand {
    pub artifact_type: ArtifactType,
    pub content: String,
    pub title: Option<String>,
    pub creator: Option<String>,
    pub in_line: bool,
    pub artifacts: Vec<String>,
    pub answers: Vec<String>,
    pub test_cases: Vec<String>,
    pub programming_resources: Vec<String>,
    pub choices: Vec<CreateChoiceCommand>,
    pub boilerplate_code: Option<String>,
    pub topics: Vec<String>,
}

impl CreateArtifactCommand {
    pub fn new(artifact_type: ArtifactType, content: impl Into<String>) -> Self {
        Self {
            artifact_type,
            content: content.into(),
            title: None,
            creator: None,
            in_line: false,
            artifacts: Vec::new(),
            answers: Vec::new(),
            test_cases: Vec::new(),
            programming_resources: Vec::new(),
            choices: Vec::new(),
            boilerplate_code: None,
            topics: Vec::new(),
        }
    }

    fn references(&self, kind: ReferenceKind) -> &[String] {
        match kind {
            ReferenceKind::Children => &self.artifacts,
            ReferenceKind::Answers => &self.answers,
            ReferenceKind::TestCases => &self.test_cases,
            ReferenceKind::ProgrammingResources => &self.programming_resources,
        }
    }

    /// Every referenced guid in validation order: edge kinds in table
    /// order, then choice targets, then the boilerplate reference.
    fn referenced_guids(&self) -> Vec<&str> {
        let mut guids: Vec<&str> = REFERENCE_POLICIES
            .iter()
            .flat_map(|policy| self.references(policy.kind))
            .map(String::as_str)
            .collect();
        guids.extend(
            self.choices
                .iter()
                .filter_map(|choice| choice.artifact_id.as_deref()),
        );
        guids.extend(self.boilerplate_code.as_deref());
        guids
    }
}

#[derive(Clone)]
pub struct ArtifactService {
    reader: Arc<dyn ArtifactsRepo>,
    writer: Arc<dyn ArtifactsWriteRepo>,
    resolver: ReferenceResolver,
    views: Option<ResilientViewCache>,
    cache_trigger: Option<Arc<CacheTrigger>>,
    depth_limit: u32,
}

impl ArtifactService {
    pub fn new(reader: Arc<dyn ArtifactsRepo>, writer: Arc<dyn ArtifactsWriteRepo>) -> Self {
        Self {
            resolver: ReferenceResolver::new(reader.clone()),
            reader,
            writer,
            views: None,
            cache_trigger: None,
            depth_limit: u32::MAX,
        }
    }

    /// Serve listings from materialized views.
    pub fn with_view_cache_opt(mut self, views: Option<ResilientViewCache>) -> Self {
        self.views = views;
        self
    }

    pub fn with_cache_trigger_opt(mut self, trigger: Option<Arc<CacheTrigger>>) -> Self {
        self.cache_trigger = trigger;
        self
    }

    pub fn with_depth_limit(mut self, depth_limit: u32) -> Self {
        self.depth_limit = depth_limit;
        self
    }

    pub async fn list(&self, query: &ArtifactListQuery) -> Result<Page, ArtifactServiceError> {
        let depth = self.checked_depth(query.depth)?;

        let Some(cache) = &self.views else {
            let records = self.reader.list_artifacts(&query.filter).await?;
            let views = self.resolver.resolve(records, depth).await?;
            return Ok(paging::apply(&views, query));
        };

        let key = ViewKey::artifacts(depth);
        let views = match cache.get(&key).await {
            Some(views) => views,
            None => {
                let records = self
                    .reader
                    .list_artifacts(&ArtifactQueryFilter::default())
                    .await?;
                let views = Arc::new(self.resolver.resolve(records, depth).await?);
                // A write committed after the load above is not reflected here;
                // this entry stays stale until the next write invalidates it.
                cache.put(key, views.clone()).await;
                views
            }
        };

        Ok(paging::apply(&views, query))
    }

    /// Reads one artifact straight from the store.
    pub async fn get(
        &self,
        guid: &str,
        depth: u32,
    ) -> Result<Arc<ArtifactView>, ArtifactServiceError> {
        let depth = self.checked_depth(depth)?;
        let guid = Uuid::parse_str(guid.trim()).map_err(|_| ArtifactServiceError::NotFound)?;
        let record = self
            .reader
            .find_by_guid(guid)
            .await?
            .ok_or(ArtifactServiceError::NotFound)?;

        self.resolver
            .resolve(vec![record], depth)
            .await?
            .into_iter()
            .next()
            .ok_or(ArtifactServiceError::NotFound)
    }

    fn checked_depth(&self, requested: u32) -> Result<u32, ArtifactServiceError> {
        if requested > self.depth_limit {
            return Err(ArtifactServiceError::DepthLimitExceeded {
                requested,
                limit: self.depth_limit,
            });
        }
        Ok(requested)
    }

    pub async fn create(&self, command: CreateArtifactCommand) -> Result<Uuid, ArtifactServiceError> {
        if command.content.trim().is_empty() {
            return Err(DomainError::validation("content must not be empty").into());
        }

        let resolved = self.resolve_references(&command).await?;
        let lookup = |raw: &str| -> Result<ResolvedReference, ArtifactServiceError> {
            resolved
                .iter()
                .find(|(candidate, _)| *candidate == raw)
                .map(|(_, reference)| *reference)
                .ok_or_else(|| ArtifactServiceError::ReferenceNotFound(raw.to_string()))
        };

        let mut edges = Vec::new();
        for policy in &REFERENCE_POLICIES {
            for (index, raw) in command.references(policy.kind).iter().enumerate() {
                let order = match policy.ordering {
                    EdgeOrdering::Ordered => Some(i32::try_from(index).unwrap_or(i32::MAX)),
                    EdgeOrdering::StoreOrder => None,
                };
                edges.push(NewReferenceEdge {
                    kind: policy.kind,
                    target: lookup(raw)?,
                    order,
                });
            }
        }

        let choices = command
            .choices
            .iter()
            .map(|choice| {
                Ok(NewNavigationChoice {
                    choice: choice.title.clone(),
                    order: choice.order,
                    target: choice.artifact_id.as_deref().map(&lookup).transpose()?,
                })
            })
            .collect::<Result<Vec<_>, ArtifactServiceError>>()?;

        let boilerplate_code = command.boilerplate_code.as_deref().map(&lookup).transpose()?;

        let params = CreateArtifactParams {
            guid: Uuid::new_v4(),
            artifact_type: command.artifact_type,
            content: command.content,
            title: non_blank(command.title.as_deref()).map(str::to_string),
            creator: non_blank(command.creator.as_deref()).map(str::to_string),
            in_line: command.in_line,
            boilerplate_code,
            edges,
            choices,
            topics: normalize_topics(command.topics),
        };

        let record = self.writer.create_artifact(params).await.map_err(|err| {
            if err.is_constraint_violation() {
                warn!(error = %err, "Artifact insert rejected by store constraint");
                ArtifactServiceError::ConstraintViolation(err)
            } else {
                ArtifactServiceError::Repo(err)
            }
        })?;

        info!(guid = %record.guid, artifact_type = %record.artifact_type, "Artifact created");

        if let Some(trigger) = &self.cache_trigger {
            trigger.artifact_created(record.guid).await;
        }

        Ok(record.guid)
    }

    /// Looks up every referenced guid in one round trip. The first reference
    /// that is malformed or unknown, in validation order, fails the call.
    async fn resolve_references<'a>(
        &self,
        command: &'a CreateArtifactCommand,
    ) -> Result<Vec<(&'a str, ResolvedReference)>, ArtifactServiceError> {
        let raw = command.referenced_guids();
        if raw.is_empty() {
            return Ok(Vec::new());
        }

        let parsed: Vec<Option<Uuid>> = raw
            .iter()
            .map(|value| Uuid::parse_str(value.trim()).ok())
            .collect();
        let lookup: Vec<Uuid> = parsed
            .iter()
            .flatten()
            .copied()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let known = if lookup.is_empty() {
            Default::default()
        } else {
            self.reader.find_ids_by_guids(&lookup).await?
        };

        raw.into_iter()
            .zip(parsed)
            .map(|(value, guid)| {
                guid.and_then(|guid| known.get(&guid).map(|id| ResolvedReference { id: *id, guid }))
                    .map(|reference| (value, reference))
                    .ok_or_else(|| ArtifactServiceError::ReferenceNotFound(value.to_string()))
            })
            .collect()
    }
}

fn normalize_topics(topics: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    topics
        .into_iter()
        .map(|topic| topic.trim().to_string())
        .filter(|topic| !topic.is_empty() && seen.insert(topic.clone()))
        .collect()
}
