//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::{references::ReferenceKind, types::ArtifactType};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactRecord {
    pub id: i64,
    pub guid: Uuid,
    pub artifact_type: ArtifactType,
    pub content: String,
    pub title: Option<String>,
    pub creator: Option<String>,
    pub creation_time: OffsetDateTime,
    pub deprecated: bool,
    pub in_line: bool,
    pub boilerplate_code: Option<Uuid>,
    pub topics: Vec<String>,
}

/// One typed edge row, joined with the guid of its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEdge {
    pub kind: ReferenceKind,
    pub source_id: i64,
    pub target_id: i64,
    pub target_guid: Uuid,
    /// Only populated for ordered kinds.
    pub order: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationChoiceRecord {
    pub artifact_id: i64,
    pub choice: String,
    pub order: i32,
    pub target_guid: Option<Uuid>,
}

/// Edges and navigation choices owned by a batch of artifacts, in store order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    pub edges: Vec<ReferenceEdge>,
    pub choices: Vec<NavigationChoiceRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodingFeedbackResponseRecord {
    pub id: i64,
    pub guid: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserHistoryRecord {
    pub id: i64,
    pub user_id: String,
    pub session: String,
    pub artifact_id: i64,
    pub user_artifact_id: Option<i64>,
    pub coding_feedback_response_id: Option<i64>,
}
