use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{aio::ConnectionManager, AsyncCommands, Script};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::contract::model::Fruit;
use crate::domain::ports::{CacheError, FruitListCache};

/// Cached listing entry; decoupled from the REST DTO.
#[derive(Serialize, Deserialize)]
struct CachedFruit {
    id: Uuid,
    name: String,
    quantity: i32,
    price: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&Fruit> for CachedFruit {
    fn from(f: &Fruit) -> Self {
        Self {
            id: f.id,
            name: f.name.clone(),
            quantity: f.quantity,
            price: f.price,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

impl From<CachedFruit> for Fruit {
    fn from(c: CachedFruit) -> Self {
        Self {
            id: c.id,
            name: c.name,
            quantity: c.quantity,
            price: c.price,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

fn encode(fruits: &[Fruit]) -> Result<String, CacheError> {
    let entries: Vec<CachedFruit> = fruits.iter().map(CachedFruit::from).collect();
    Ok(serde_json::to_string(&entries)?)
}

fn decode(raw: &str) -> Result<Vec<Fruit>, CacheError> {
    let entries: Vec<CachedFruit> = serde_json::from_str(raw)?;
    Ok(entries.into_iter().map(Fruit::from).collect())
}

fn backend(e: redis::RedisError) -> CacheError {
    CacheError::Backend(e.to_string())
}

// KEYS: listing, generation. ARGV: expected generation, payload, ttl secs.
const PUT_IF_CURRENT: &str = r"
local current = redis.call('GET', KEYS[2]) or '0'
if current ~= ARGV[1] then
  return 0
end
redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
return 1
";

/// Listing stored as one JSON string under a fixed key with an expiry; the
/// write generation lives next to it under `<key>:gen`.
#[derive(Clone)]
pub struct RedisFruitCache {
    conn: ConnectionManager,
    key: String,
    generation_key: String,
    ttl: Duration,
    put_if_current: Script,
}

impl RedisFruitCache {
    pub async fn connect(url: &str, key: impl Into<String>, ttl: Duration) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        let key = key.into();
        info!(key = %key, ttl_secs = ttl.as_secs(), "fruit list cache connected");
        Ok(Self::new(conn, key, ttl))
    }

    pub fn new(conn: ConnectionManager, key: impl Into<String>, ttl: Duration) -> Self {
        let key = key.into();
        Self {
            conn,
            generation_key: format!("{key}:gen"),
            key,
            ttl,
            put_if_current: Script::new(PUT_IF_CURRENT),
        }
    }
}

#[async_trait]
impl FruitListCache for RedisFruitCache {
    async fn get(&self) -> Result<Option<Vec<Fruit>>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(&self.key).await.map_err(backend)?;
        raw.as_deref().map(decode).transpose()
    }

    async fn generation(&self) -> Result<u64, CacheError> {
        let mut conn = self.conn.clone();
        let current: Option<u64> = conn.get(&self.generation_key).await.map_err(backend)?;
        Ok(current.unwrap_or(0))
    }

    async fn put(&self, generation: u64, fruits: &[Fruit]) -> Result<bool, CacheError> {
        let payload = encode(fruits)?;
        let mut conn = self.conn.clone();
        // Redis rejects a zero expiry.
        let secs = self.ttl.as_secs().max(1);
        let stored: i32 = self
            .put_if_current
            .key(&self.key)
            .key(&self.generation_key)
            .arg(generation)
            .arg(payload)
            .arg(secs)
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(stored == 1)
    }

    async fn invalidate(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .incr(&self.generation_key, 1)
            .ignore()
            .del(&self.key)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(backend)
    }
}

/// Used when no cache endpoint is configured: every read misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledFruitCache;

#[async_trait]
impl FruitListCache for DisabledFruitCache {
    async fn get(&self) -> Result<Option<Vec<Fruit>>, CacheError> {
        Ok(None)
    }

    async fn generation(&self) -> Result<u64, CacheError> {
        Ok(0)
    }

    async fn put(&self, _generation: u64, _fruits: &[Fruit]) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn invalidate(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
