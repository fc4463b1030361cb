use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::artifacts::ArtifactServiceError;
use crate::application::error::ErrorReport;
use crate::application::history::HistoryServiceError;
use crate::application::repos::RepoError;
use crate::application::resolver::ResolveError;
use crate::domain::error::DomainError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const REFERENCE_NOT_FOUND: &str = "reference_not_found";
    pub const CONSTRAINT_VIOLATION: &str = "constraint_violation";
    pub const INVALID_TYPE: &str = "invalid_type";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const DUPLICATE: &str = "duplicate";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    hint: Option<String>,
    /// Logged through the attached report, never rendered.
    detail: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            hint,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn bad_request(message: impl Into<String>, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn invalid_type(value: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_TYPE,
            "Invalid artifact type",
            Some(format!("`{value}` is not a known artifact type")),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = format!(
            "{}: {}",
            self.code,
            self.detail
                .as_deref()
                .or(self.hint.as_deref())
                .unwrap_or(&self.message)
        );
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message,
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message("infra::http::api", self.status, detail).attach(&mut response);
        response
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { constraint } => ApiError::new(
                StatusCode::CONFLICT,
                codes::DUPLICATE,
                "Duplicate record",
                Some(constraint),
            ),
            RepoError::NotFound => ApiError::not_found("resource not found"),
            RepoError::InvalidInput { message } => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(message),
            ),
            RepoError::Integrity { message } => ApiError::new(
                StatusCode::CONFLICT,
                codes::INTEGRITY,
                "Integrity constraint violated",
                Some(message),
            ),
            RepoError::Timeout => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Database timeout",
                None,
            ),
            RepoError::Persistence(message) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "Persistence error",
                Some(message),
            ),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::UnknownArtifactType { value } => ApiError::invalid_type(&value),
            DomainError::Validation { message } => {
                ApiError::bad_request("Invalid artifact", Some(message))
            }
        }
    }
}

impl From<ArtifactServiceError> for ApiError {
    fn from(err: ArtifactServiceError) -> Self {
        match err {
            ArtifactServiceError::ReferenceNotFound(_) => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::REFERENCE_NOT_FOUND,
                err.to_string(),
                None,
            ),
            ArtifactServiceError::ConstraintViolation(source) => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::CONSTRAINT_VIOLATION,
                "Unable to create the artifact, a referenced record does not exist.",
                None,
            )
            .with_detail(source.to_string()),
            ArtifactServiceError::DepthLimitExceeded { limit, .. } => ApiError::bad_request(
                err.to_string(),
                Some(format!("depth must be between 0 and {limit}")),
            ),
            ArtifactServiceError::NotFound => ApiError::not_found("Artifact not found"),
            ArtifactServiceError::Domain(domain) => domain.into(),
            ArtifactServiceError::Resolve(ResolveError::Repo(repo))
            | ArtifactServiceError::Repo(repo) => repo.into(),
            ArtifactServiceError::Resolve(resolve @ ResolveError::MissingArtifact { .. }) => {
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::REPO,
                    "Artifact graph is inconsistent",
                    Some(resolve.to_string()),
                )
            }
        }
    }
}

impl From<HistoryServiceError> for ApiError {
    fn from(err: HistoryServiceError) -> Self {
        match err {
            HistoryServiceError::FeedbackResponseNotFound(guid) => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::NOT_FOUND,
                "Coding feedback response not found",
                Some(guid),
            ),
            HistoryServiceError::HistoryNotFound(id) => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::NOT_FOUND,
                "User history not found",
                Some(id.to_string()),
            ),
            HistoryServiceError::Repo(repo) => repo.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangling_reference_names_the_guid() {
        let err = ApiError::from(ArtifactServiceError::ReferenceNotFound("abc".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), codes::REFERENCE_NOT_FOUND);
        assert!(err.message.contains("abc"));
    }

    #[test]
    fn missing_history_targets_are_bad_requests() {
        let err = ApiError::from(HistoryServiceError::HistoryNotFound(7));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), codes::NOT_FOUND);
    }

    #[test]
    fn constraint_violation_keeps_store_detail_out_of_the_body() {
        let source = RepoError::Integrity {
            message: "insert on table \"artifact_edges\" violates foreign key constraint".into(),
        };
        let response = ApiError::from(ArtifactServiceError::ConstraintViolation(source))
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert!(report.messages[0].contains("artifact_edges"));

        let err = ApiError::from(ArtifactServiceError::ConstraintViolation(
            RepoError::Integrity {
                message: "artifact_edges_target_fkey".into(),
            },
        ));
        assert_eq!(err.code(), codes::CONSTRAINT_VIOLATION);
        assert!(err.hint.is_none());
        assert!(!err.message.contains("artifact_edges"));
    }

    #[test]
    fn excessive_depth_is_a_bad_request_naming_the_limit() {
        let err = ApiError::from(ArtifactServiceError::DepthLimitExceeded {
            requested: 40,
            limit: 16,
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), codes::BAD_REQUEST);
        assert!(err.message.contains("16"));
    }

    #[test]
    fn repo_timeouts_are_unavailable() {
        let err = ApiError::from(ArtifactServiceError::Repo(RepoError::Timeout));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn error_response_carries_report() {
        let response = ApiError::invalid_type("video").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert!(report.messages[0].starts_with("invalid_type"));
    }
}
