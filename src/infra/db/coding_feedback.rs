use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    application::repos::{CodingFeedbackRepo, RepoError},
    domain::entities::CodingFeedbackResponseRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl CodingFeedbackRepo for PostgresRepositories {
    async fn find_response_by_guid(
        &self,
        guid: Uuid,
    ) -> Result<Option<CodingFeedbackResponseRecord>, RepoError> {
        let row = sqlx::query_as::<_, (i64, Uuid)>(
            "SELECT id, guid FROM coding_feedback_responses WHERE guid = $1",
        )
        .bind(guid)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|(id, guid)| CodingFeedbackResponseRecord { id, guid }))
    }
}
