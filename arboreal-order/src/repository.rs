use async_trait::async_trait;
use uuid::Uuid;

use crate::models::BookingDraft;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Draft store unavailable: {0}")]
    Backend(String),
    #[error("Draft could not be encoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence seam for booking drafts. Implementations expire drafts on their own schedule.
#[async_trait]
pub trait DraftRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<BookingDraft>, StoreError>;
    async fn save(&self, draft: &BookingDraft) -> Result<(), StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    /// Removes drafts past their TTL and returns how many went. Stores that expire keys
    /// themselves keep the default.
    async fn purge_expired(&self) -> Result<usize, StoreError> {
        Ok(0)
    }
}
