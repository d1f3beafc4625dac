use arboreal_order::{BookingDraft, DraftRepository, StoreError};
use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;
use uuid::Uuid;

/// Booking drafts stored as JSON under `booking:draft:{id}`, expiring after the configured TTL.
#[derive(Clone)]
pub struct RedisDraftStore {
    client: redis::Client,
    ttl_seconds: u64,
}

impl RedisDraftStore {
    pub async fn new(connection_string: &str, ttl_seconds: u64) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client, ttl_seconds })
    }

    fn key(id: Uuid) -> String {
        format!("booking:draft:{}", id)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend)
    }
}

fn backend(e: redis::RedisError) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl DraftRepository for RedisDraftStore {
    async fn get(&self, id: Uuid) -> Result<Option<BookingDraft>, StoreError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.get(Self::key(id)).await.map_err(backend)?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, draft: &BookingDraft) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let json = serde_json::to_string(draft)?;
        conn.set_ex::<_, _, ()>(Self::key(draft.id), json, self.ttl_seconds)
            .await
            .map_err(backend)?;
        debug!("Draft saved: {} ({:?})", draft.id, draft.stage);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(Self::key(id)).await.map_err(backend)?;
        Ok(())
    }
}
