use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("unknown artifact type `{value}`")]
    UnknownArtifactType { value: String },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn unknown_artifact_type(value: impl Into<String>) -> Self {
        Self::UnknownArtifactType {
            value: value.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
