use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use user_events::UserProjection;
use uuid::Uuid;

use crate::domain::repo::{ReplicaUsersRepository, UpsertOutcome};

#[derive(Clone)]
pub struct PgReplicaUsersRepository {
    pool: PgPool,
}

impl PgReplicaUsersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReplicaUsersRepository for PgReplicaUsersRepository {
    async fn upsert_by_username(&self, user: &UserProjection) -> anyhow::Result<UpsertOutcome> {
        // `xmax = 0` only for a freshly inserted tuple. No row comes back when
        // the WHERE guard rejects an older event.
        let inserted: Option<bool> = sqlx::query_scalar(
            "INSERT INTO users (id, username, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (username) DO UPDATE \
                SET role = EXCLUDED.role, updated_at = EXCLUDED.updated_at \
              WHERE users.updated_at <= EXCLUDED.updated_at \
             RETURNING (xmax = 0)",
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.role)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to upsert user '{}'", user.username))?;

        Ok(match inserted {
            Some(true) => UpsertOutcome::Inserted,
            Some(false) => UpsertOutcome::Updated,
            None => UpsertOutcome::Stale,
        })
    }
}
