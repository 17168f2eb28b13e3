//! Outbound ports of the domain. Postgres, Redis and AMQP adapters live in
//! `infra`; tests provide in-memory implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use user_events::UserEvent;
use uuid::Uuid;

use crate::contract::model::{Fruit, FruitDraft, User};

#[async_trait]
pub trait FruitRepository: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Fruit>>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Fruit>>;
    async fn insert(&self, fruit: &Fruit) -> anyhow::Result<()>;
    /// Replace the mutable fields; `None` when no row has this id.
    async fn update(
        &self,
        id: Uuid,
        draft: &FruitDraft,
        updated_at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Fruit>>;
    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    UsernameTaken,
}

#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<User>>;
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    /// Insert the user and enqueue `event` in the outbox within one transaction.
    async fn insert_with_event(&self, user: &User, event: &UserEvent)
        -> anyhow::Result<InsertOutcome>;
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cached value is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Cache of the full fruit listing.
///
/// Every `invalidate` bumps a write generation. A listing read from storage
/// is only stored if the generation observed before the read is still
/// current, so a read overtaken by a write never repopulates the cache.
#[async_trait]
pub trait FruitListCache: Send + Sync {
    async fn get(&self) -> Result<Option<Vec<Fruit>>, CacheError>;
    async fn generation(&self) -> Result<u64, CacheError>;
    /// Returns false when the listing was invalidated after `generation`.
    async fn put(&self, generation: u64, fruits: &[Fruit]) -> Result<bool, CacheError>;
    async fn invalidate(&self) -> Result<(), CacheError>;
}

/// Unpublished outbox row.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxRecord {
    pub id: i64,
    pub payload: serde_json::Value,
    pub attempts: i32,
}

#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Oldest unpublished records, in id order.
    async fn pending(&self, limit: usize) -> anyhow::Result<Vec<OutboxRecord>>;
    async fn mark_published(&self, id: i64) -> anyhow::Result<()>;
    /// Record a failed attempt; the record stays pending.
    async fn mark_failed(&self, id: i64, error: &str) -> anyhow::Result<()>;
}

/// Hands encoded user events to the broker; returns once the broker confirmed.
#[async_trait]
pub trait UserEventPublisher: Send + Sync {
    async fn publish(&self, body: &[u8]) -> anyhow::Result<()>;
}
