use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::contract::model::{Fruit, FruitDraft};
use crate::domain::ports::FruitRepository;

#[derive(sqlx::FromRow)]
struct FruitRow {
    id: Uuid,
    name: String,
    quantity: i32,
    price: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FruitRow> for Fruit {
    fn from(r: FruitRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            quantity: r.quantity,
            price: r.price,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const COLUMNS: &str = "id, name, quantity, price, created_at, updated_at";

#[derive(Clone)]
pub struct PgFruitRepository {
    pool: PgPool,
}

impl PgFruitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FruitRepository for PgFruitRepository {
    async fn list(&self) -> anyhow::Result<Vec<Fruit>> {
        let rows: Vec<FruitRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM fruits ORDER BY created_at, id"))
                .fetch_all(&self.pool)
                .await
                .context("failed to list fruits")?;
        Ok(rows.into_iter().map(Fruit::from).collect())
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Fruit>> {
        let row: Option<FruitRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM fruits WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("failed to load fruit {id}"))?;
        Ok(row.map(Fruit::from))
    }

    async fn insert(&self, fruit: &Fruit) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO fruits (id, name, quantity, price, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(fruit.id)
        .bind(&fruit.name)
        .bind(fruit.quantity)
        .bind(fruit.price)
        .bind(fruit.created_at)
        .bind(fruit.updated_at)
        .execute(&self.pool)
        .await
        .context("failed to insert fruit")?;
        Ok(())
    }

    async fn update(
        &self,
        id: Uuid,
        draft: &FruitDraft,
        updated_at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Fruit>> {
        let row: Option<FruitRow> = sqlx::query_as(&format!(
            "UPDATE fruits SET name = $1, quantity = $2, price = $3, updated_at = $4 \
             WHERE id = $5 RETURNING {COLUMNS}"
        ))
        .bind(&draft.name)
        .bind(draft.quantity)
        .bind(draft.price)
        .bind(updated_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to update fruit {id}"))?;
        Ok(row.map(Fruit::from))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM fruits WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete fruit {id}"))?;
        Ok(res.rows_affected() > 0)
    }
}
