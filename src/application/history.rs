use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{CodingFeedbackRepo, RepoError, UserHistoryRepo};
use crate::cache::CacheTrigger;

#[derive(Debug, Error)]
pub enum HistoryServiceError {
    #[error("coding feedback response `{0}` not found")]
    FeedbackResponseNotFound(String),
    #[error("user history `{0}` not found")]
    HistoryNotFound(i64),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl HistoryServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            HistoryServiceError::FeedbackResponseNotFound(_)
                | HistoryServiceError::HistoryNotFound(_)
        )
    }
}

/// Links user-history rows to coding-feedback responses.
#[derive(Clone)]
pub struct UserHistoryService {
    history: Arc<dyn UserHistoryRepo>,
    feedback: Arc<dyn CodingFeedbackRepo>,
    cache_trigger: Option<Arc<CacheTrigger>>,
}

impl UserHistoryService {
    pub fn new(history: Arc<dyn UserHistoryRepo>, feedback: Arc<dyn CodingFeedbackRepo>) -> Self {
        Self {
            history,
            feedback,
            cache_trigger: None,
        }
    }

    pub fn with_cache_trigger_opt(mut self, trigger: Option<Arc<CacheTrigger>>) -> Self {
        self.cache_trigger = trigger;
        self
    }

    /// Points `history_id` at the response identified by `response_guid`.
    ///
    /// Repeating the call with the same arguments leaves the same state.
    pub async fn update_history(
        &self,
        history_id: i64,
        response_guid: &str,
    ) -> Result<(), HistoryServiceError> {
        let not_found = || HistoryServiceError::FeedbackResponseNotFound(response_guid.to_string());

        let guid = Uuid::parse_str(response_guid.trim()).map_err(|_| not_found())?;
        let response = self
            .feedback
            .find_response_by_guid(guid)
            .await?
            .ok_or_else(not_found)?;

        let updated = self
            .history
            .link_feedback_response(history_id, response.id)
            .await?;
        if updated == 0 {
            return Err(HistoryServiceError::HistoryNotFound(history_id));
        }

        info!(history_id, response = %response.guid, "User history linked to feedback response");

        if let Some(trigger) = &self.cache_trigger {
            trigger.user_history_linked(history_id).await;
        }

        Ok(())
    }
}
