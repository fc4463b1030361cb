use std::sync::Arc;

use async_trait::async_trait;

use crate::application::artifacts::ArtifactService;
use crate::application::history::UserHistoryService;
use crate::infra::db::PostgresRepositories;

/// Liveness check for the backing database.
#[async_trait]
pub trait DatabaseHealth: Send + Sync {
    async fn health_check(&self) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl DatabaseHealth for PostgresRepositories {
    async fn health_check(&self) -> Result<(), sqlx::Error> {
        PostgresRepositories::health_check(self).await
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub artifacts: Arc<ArtifactService>,
    pub history: Arc<UserHistoryService>,
    pub db: Arc<dyn DatabaseHealth>,
}
