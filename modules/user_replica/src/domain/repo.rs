use async_trait::async_trait;
use user_events::UserProjection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// The stored row is newer than the event; nothing changed.
    Stale,
}

/// Replica store keyed by username.
#[async_trait]
pub trait ReplicaUsersRepository: Send + Sync {
    /// Insert or update the row for `user.username`. The replica keeps its own
    /// row id; an event older than the stored row is ignored.
    async fn upsert_by_username(&self, user: &UserProjection) -> anyhow::Result<UpsertOutcome>;
}
