//! In-memory draft store, used when no Redis URL is configured

use arboreal_order::{BookingDraft, DraftRepository, StoreError};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

/// Drafts untouched for longer than the TTL are treated as gone.
pub struct InMemoryDraftStore {
    drafts: DashMap<Uuid, BookingDraft>,
    ttl: Duration,
}

impl InMemoryDraftStore {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            drafts: DashMap::new(),
            ttl: Duration::seconds(ttl_seconds as i64),
        }
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}

impl Default for InMemoryDraftStore {
    fn default() -> Self {
        Self::new(3600)
    }
}

#[async_trait]
impl DraftRepository for InMemoryDraftStore {
    async fn get(&self, id: Uuid) -> Result<Option<BookingDraft>, StoreError> {
        let expired = match self.drafts.get(&id) {
            Some(entry) if Utc::now() - entry.updated_at <= self.ttl => {
                return Ok(Some(entry.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.drafts.remove(&id);
        }
        Ok(None)
    }

    async fn save(&self, draft: &BookingDraft) -> Result<(), StoreError> {
        self.drafts.insert(draft.id, draft.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.drafts.remove(&id);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = Utc::now();
        let mut purged = 0;
        self.drafts.retain(|_, draft| {
            let live = now - draft.updated_at <= self.ttl;
            if !live {
                purged += 1;
            }
            live
        });
        Ok(purged)
    }
}
