use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use user_events::UserEvent;
use uuid::Uuid;

use crate::contract::model::{Role, User};
use crate::domain::ports::{InsertOutcome, UsersRepository};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let role: Role = r
            .role
            .parse()
            .map_err(|e| anyhow!("user {}: {e}", r.username))?;
        Ok(Self {
            id: r.id,
            username: r.username,
            password_hash: r.password_hash,
            role,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

const COLUMNS: &str = "id, username, password_hash, role, created_at, updated_at";

#[derive(Clone)]
pub struct PgUsersRepository {
    pool: PgPool,
}

impl PgUsersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsersRepository for PgUsersRepository {
    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM users ORDER BY created_at, id"))
                .fetch_all(&self.pool)
                .await
                .context("failed to list users")?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM users WHERE username = $1"))
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .context("failed to look up user")?;
        row.map(User::try_from).transpose()
    }

    async fn insert_with_event(
        &self,
        user: &User,
        event: &UserEvent,
    ) -> anyhow::Result<InsertOutcome> {
        let payload = event.to_value()?;
        let mut tx = self.pool.begin().await.context("failed to begin transaction")?;

        let inserted = sqlx::query(
            "INSERT INTO users (id, username, password_hash, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                // Dropping `tx` rolls back.
                return Ok(InsertOutcome::UsernameTaken);
            }
            Err(e) => return Err(e).context("failed to insert user"),
        }

        sqlx::query(
            "INSERT INTO user_outbox (aggregate_id, action, payload) VALUES ($1, $2, $3)",
        )
        .bind(user.id)
        .bind(event.action.as_str())
        .bind(payload)
        .execute(&mut *tx)
        .await
        .context("failed to enqueue user event")?;

        tx.commit().await.context("failed to commit user creation")?;
        Ok(InsertOutcome::Inserted)
    }
}
