//! Artifact and user-history handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;

use super::error::ApiError;
use super::models::{
    ArtifactCreateRequest, ArtifactListParams, DepthParams, MessageResponse,
    UserHistoryUpdateRequest,
};
use super::state::ApiState;

pub async fn list_artifacts(
    State(state): State<ApiState>,
    query: Result<Query<ArtifactListParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query.map_err(query_rejection)?;
    let query = params.into_query()?;

    let page = state.artifacts.list(&query).await?;
    Ok(Json(page))
}

pub async fn get_artifact(
    State(state): State<ApiState>,
    Path(guid): Path<String>,
    query: Result<Query<DepthParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query.map_err(query_rejection)?;

    let view = state
        .artifacts
        .get(&guid, params.depth.unwrap_or(0))
        .await?;
    Ok(Json(view))
}

pub async fn create_artifact(
    State(state): State<ApiState>,
    payload: Result<Json<ArtifactCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(json_rejection)?;
    let command = payload.into_command()?;

    let guid = state.artifacts.create(command).await?;
    Ok(Json(guid))
}

pub async fn update_user_history(
    State(state): State<ApiState>,
    payload: Result<Json<UserHistoryUpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(json_rejection)?;

    state
        .history
        .update_history(payload.id, &payload.coding_feedback_response_id)
        .await?;

    Ok(Json(MessageResponse::new("User history successfully updated")))
}

fn json_rejection(err: JsonRejection) -> ApiError {
    ApiError::bad_request("Invalid request body", Some(err.body_text()))
}

fn query_rejection(err: QueryRejection) -> ApiError {
    ApiError::bad_request("Invalid query string", Some(err.body_text()))
}
