use serde::{Deserialize, Serialize};

use crate::application::artifacts::{CreateArtifactCommand, CreateChoiceCommand};
use crate::application::paging::ArtifactListQuery;
use crate::application::repos::ArtifactQueryFilter;
use crate::domain::types::ArtifactType;

use super::error::ApiError;

/// Query string accepted by the artifact listing.
#[derive(Debug, Default, Deserialize)]
pub struct ArtifactListParams {
    pub depth: Option<u32>,
    pub show_deprecated: Option<bool>,
    #[serde(rename = "type")]
    pub artifact_type: Option<String>,
    pub creator: Option<String>,
    pub title: Option<String>,
    pub topic: Option<String>,
    pub search: Option<String>,
    pub in_line: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<i64>,
}

impl ArtifactListParams {
    pub fn into_query(self) -> Result<ArtifactListQuery, ApiError> {
        let artifact_type = parse_optional_type(self.artifact_type.as_deref())?;

        Ok(ArtifactListQuery {
            depth: self.depth.unwrap_or(0),
            show_deprecated: self.show_deprecated.unwrap_or(false),
            filter: ArtifactQueryFilter {
                artifact_type,
                creator: self.creator,
                title: self.title,
                topic: self.topic,
                search: self.search,
                in_line: self.in_line,
            },
            limit: self.limit,
            offset: self.offset,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DepthParams {
    pub depth: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChoiceRequest {
    pub title: String,
    pub order: i32,
    #[serde(default)]
    pub artifact_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ArtifactCreateRequest {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub in_line: Option<bool>,
    #[serde(default)]
    pub artifacts: Option<Vec<String>>,
    #[serde(default)]
    pub answers: Option<Vec<String>>,
    #[serde(default)]
    pub test_cases: Option<Vec<String>>,
    #[serde(default)]
    pub programming_resources: Option<Vec<String>>,
    #[serde(default)]
    pub choices: Option<Vec<ChoiceRequest>>,
    #[serde(default)]
    pub boilerplate_code: Option<String>,
    #[serde(default)]
    pub topics: Option<Vec<String>>,
}

impl ArtifactCreateRequest {
    pub fn into_command(self) -> Result<CreateArtifactCommand, ApiError> {
        let artifact_type = self
            .artifact_type
            .parse::<ArtifactType>()
            .map_err(|_| ApiError::invalid_type(&self.artifact_type))?;

        let mut command = CreateArtifactCommand::new(artifact_type, self.content);
        command.title = self.title;
        command.creator = self.creator;
        command.in_line = self.in_line.unwrap_or(false);
        command.artifacts = self.artifacts.unwrap_or_default();
        command.answers = self.answers.unwrap_or_default();
        command.test_cases = self.test_cases.unwrap_or_default();
        command.programming_resources = self.programming_resources.unwrap_or_default();
        command.choices = self
            .choices
            .unwrap_or_default()
            .into_iter()
            .map(|choice| CreateChoiceCommand {
                title: choice.title,
                order: choice.order,
                artifact_id: choice.artifact_id,
            })
            .collect();
        command.boilerplate_code = self.boilerplate_code;
        command.topics = self.topics.unwrap_or_default();
        Ok(command)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UserHistoryUpdateRequest {
    pub id: i64,
    pub coding_feedback_response_id: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn parse_optional_type(value: Option<&str>) -> Result<Option<ArtifactType>, ApiError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value
            .parse::<ArtifactType>()
            .map(Some)
            .map_err(|_| ApiError::invalid_type(value)),
        None => Ok(None),
    }
}
