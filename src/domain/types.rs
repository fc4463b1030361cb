//! Shared domain enumerations aligned with persisted database enums.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "artifact_type", rename_all = "snake_case")]
pub enum ArtifactType {
    Text,
    Question,
    Answer,
    ProgrammingExercise,
    TestCase,
    Navigational,
    Resource,
    BoilerplateCode,
}

impl ArtifactType {
    pub const ALL: [ArtifactType; 8] = [
        ArtifactType::Text,
        ArtifactType::Question,
        ArtifactType::Answer,
        ArtifactType::ProgrammingExercise,
        ArtifactType::TestCase,
        ArtifactType::Navigational,
        ArtifactType::Resource,
        ArtifactType::BoilerplateCode,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactType::Text => "text",
            ArtifactType::Question => "question",
            ArtifactType::Answer => "answer",
            ArtifactType::ProgrammingExercise => "programming_exercise",
            ArtifactType::TestCase => "test_case",
            ArtifactType::Navigational => "navigational",
            ArtifactType::Resource => "resource",
            ArtifactType::BoilerplateCode => "boilerplate_code",
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        ArtifactType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == trimmed)
            .ok_or_else(|| DomainError::unknown_artifact_type(trimmed))
    }
}
