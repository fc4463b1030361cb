use async_trait::async_trait;

use crate::{
    application::repos::{RepoError, UserHistoryRepo},
    domain::entities::UserHistoryRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct UserHistoryRow {
    id: i64,
    user_id: String,
    session: String,
    artifact_id: i64,
    user_artifact_id: Option<i64>,
    coding_feedback_response_id: Option<i64>,
}

impl From<UserHistoryRow> for UserHistoryRecord {
    fn from(row: UserHistoryRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            session: row.session,
            artifact_id: row.artifact_id,
            user_artifact_id: row.user_artifact_id,
            coding_feedback_response_id: row.coding_feedback_response_id,
        }
    }
}

#[async_trait]
impl UserHistoryRepo for PostgresRepositories {
    async fn find_history(&self, id: i64) -> Result<Option<UserHistoryRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserHistoryRow>(
            "SELECT id, user_id, session, artifact_id, user_artifact_id, coding_feedback_response_id \
             FROM user_history \
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserHistoryRecord::from))
    }

    async fn link_feedback_response(
        &self,
        history_id: i64,
        feedback_response_id: i64,
    ) -> Result<u64, RepoError> {
        let result = sqlx::query(
            "UPDATE user_history \
             SET coding_feedback_response_id = $2 \
             WHERE id = $1",
        )
        .bind(history_id)
        .bind(feedback_response_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
