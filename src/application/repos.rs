//! Repository traits describing persistence adapters.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{
    ArtifactRecord, CodingFeedbackResponseRecord, ReferenceSet, UserHistoryRecord,
};
use crate::domain::references::ReferenceKind;
use crate::domain::types::ArtifactType;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    /// Whether the error is a constraint failure raised by the store itself.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            RepoError::Duplicate { .. } | RepoError::InvalidInput { .. } | RepoError::Integrity { .. }
        )
    }
}

/// Search parameters for artifact listings. Every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactQueryFilter {
    pub artifact_type: Option<ArtifactType>,
    pub creator: Option<String>,
    pub title: Option<String>,
    pub topic: Option<String>,
    pub search: Option<String>,
    pub in_line: Option<bool>,
}

/// Borrowed view of the attributes a filter inspects.
#[derive(Debug, Clone, Copy)]
pub struct FilterFields<'a> {
    pub artifact_type: ArtifactType,
    pub creator: Option<&'a str>,
    pub title: Option<&'a str>,
    pub content: &'a str,
    pub topics: &'a [String],
    pub in_line: bool,
}

impl ArtifactQueryFilter {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn matches(&self, fields: FilterFields<'_>) -> bool {
        if let Some(kind) = self.artifact_type
            && kind != fields.artifact_type
        {
            return false;
        }

        if let Some(creator) = non_blank(self.creator.as_deref())
            && fields.creator != Some(creator)
        {
            return false;
        }

        if let Some(title) = non_blank(self.title.as_deref())
            && !fields.title.is_some_and(|value| contains_ci(value, title))
        {
            return false;
        }

        if let Some(topic) = non_blank(self.topic.as_deref())
            && !fields.topics.iter().any(|value| value == topic)
        {
            return false;
        }

        if let Some(search) = non_blank(self.search.as_deref()) {
            let in_title = fields.title.is_some_and(|value| contains_ci(value, search));
            if !in_title && !contains_ci(fields.content, search) {
                return false;
            }
        }

        if let Some(in_line) = self.in_line
            && in_line != fields.in_line
        {
            return false;
        }

        true
    }

    pub fn matches_record(&self, record: &ArtifactRecord) -> bool {
        self.matches(FilterFields {
            artifact_type: record.artifact_type,
            creator: record.creator.as_deref(),
            title: record.title.as_deref(),
            content: &record.content,
            topics: &record.topics,
            in_line: record.in_line,
        })
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// A validated reference: the internal id used for joins and the public guid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedReference {
    pub id: i64,
    pub guid: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReferenceEdge {
    pub kind: ReferenceKind,
    pub target: ResolvedReference,
    pub order: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNavigationChoice {
    pub choice: String,
    pub order: i32,
    pub target: Option<ResolvedReference>,
}

#[derive(Debug, Clone)]
pub struct CreateArtifactParams {
    pub guid: Uuid,
    pub artifact_type: ArtifactType,
    pub content: String,
    pub title: Option<String>,
    pub creator: Option<String>,
    pub in_line: bool,
    pub boilerplate_code: Option<ResolvedReference>,
    pub edges: Vec<NewReferenceEdge>,
    pub choices: Vec<NewNavigationChoice>,
    pub topics: Vec<String>,
}

#[async_trait]
pub trait ArtifactsRepo: Send + Sync {
    async fn find_by_guid(&self, guid: Uuid) -> Result<Option<ArtifactRecord>, RepoError>;

    /// Artifacts matching `filter`, in creation order.
    async fn list_artifacts(
        &self,
        filter: &ArtifactQueryFilter,
    ) -> Result<Vec<ArtifactRecord>, RepoError>;

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<ArtifactRecord>, RepoError>;

    /// Edges and navigation choices whose source is one of `ids`.
    async fn load_references(&self, ids: &[i64]) -> Result<ReferenceSet, RepoError>;

    /// Maps each known guid to its internal id; unknown guids are absent.
    async fn find_ids_by_guids(&self, guids: &[Uuid]) -> Result<HashMap<Uuid, i64>, RepoError>;
}

#[async_trait]
pub trait ArtifactsWriteRepo: Send + Sync {
    /// Inserts the artifact with every edge, choice and topic atomically.
    async fn create_artifact(
        &self,
        params: CreateArtifactParams,
    ) -> Result<ArtifactRecord, RepoError>;
}

#[async_trait]
pub trait UserHistoryRepo: Send + Sync {
    async fn find_history(&self, id: i64) -> Result<Option<UserHistoryRecord>, RepoError>;

    /// Returns the number of rows updated.
    async fn link_feedback_response(
        &self,
        history_id: i64,
        feedback_response_id: i64,
    ) -> Result<u64, RepoError>;
}

/// Narrow lookup into the coding-feedback subsystem.
#[async_trait]
pub trait CodingFeedbackRepo: Send + Sync {
    async fn find_response_by_guid(
        &self,
        guid: Uuid,
    ) -> Result<Option<CodingFeedbackResponseRecord>, RepoError>;
}
