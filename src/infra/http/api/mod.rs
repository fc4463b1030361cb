pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::{ApiState, DatabaseHealth};

use axum::{
    Router,
    routing::{get, put},
};

pub fn build_api_router() -> Router<ApiState> {
    Router::new()
        .route(
            "/api/v3/artifacts",
            get(handlers::list_artifacts).post(handlers::create_artifact),
        )
        .route("/api/v3/artifacts/{guid}", get(handlers::get_artifact))
        .route("/api/v3/user-history", put(handlers::update_user_history))
}
