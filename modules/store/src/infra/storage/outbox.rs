use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::ports::{OutboxRecord, OutboxStore};

#[derive(sqlx::FromRow)]
struct OutboxRow {
    id: i64,
    payload: serde_json::Value,
    attempts: i32,
}

#[derive(Clone)]
pub struct PgOutboxStore {
    pool: PgPool,
}

impl PgOutboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxStore for PgOutboxStore {
    async fn pending(&self, limit: usize) -> anyhow::Result<Vec<OutboxRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<OutboxRow> = sqlx::query_as(
            "SELECT id, payload, attempts FROM user_outbox \
             WHERE published_at IS NULL ORDER BY id LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("failed to read pending outbox records")?;
        Ok(rows
            .into_iter()
            .map(|r| OutboxRecord {
                id: r.id,
                payload: r.payload,
                attempts: r.attempts,
            })
            .collect())
    }

    async fn mark_published(&self, id: i64) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE user_outbox SET published_at = now(), attempts = attempts + 1, \
             last_error = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to mark outbox record {id} published"))?;
        Ok(())
    }

    async fn mark_failed(&self, id: i64, error: &str) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE user_outbox SET attempts = attempts + 1, last_error = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to record outbox failure for {id}"))?;
        Ok(())
    }
}
