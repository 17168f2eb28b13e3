#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use modkit::{with_standard_layers, HttpOptions};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use store::auth::{Claims, JwtKeys, PasswordHasher};
use store::contract::model::{Fruit, FruitDraft, Role, User};
use store::domain::ports::{
    CacheError, FruitListCache, FruitRepository, InsertOutcome, OutboxRecord, OutboxStore,
    UserEventPublisher, UsersRepository,
};
use store::{Store, StoreConfig, StoreDeps};
use tower::ServiceExt;
use user_events::UserEvent;
use uuid::Uuid;

pub const SECRET: &[u8] = b"test-secret";
pub const ADMIN_PASSWORD: &str = "admin-pw";

// ---------- fruits ----------

type ListHook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct MemFruits {
    rows: Mutex<Vec<Fruit>>,
    pub calls: AtomicUsize,
    /// Runs in the middle of `list`, after the rows were read.
    on_list: Mutex<Option<ListHook>>,
}

impl MemFruits {
    pub fn on_list(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_list.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn clear_on_list(&self) {
        *self.on_list.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FruitRepository for MemFruits {
    async fn list(&self) -> anyhow::Result<Vec<Fruit>> {
        self.touch();
        let rows = self.rows.lock().unwrap().clone();
        if let Some(hook) = self.on_list.lock().unwrap().as_ref() {
            hook();
        }
        Ok(rows)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Fruit>> {
        self.touch();
        Ok(self.rows.lock().unwrap().iter().find(|f| f.id == id).cloned())
    }

    async fn insert(&self, fruit: &Fruit) -> anyhow::Result<()> {
        self.touch();
        self.rows.lock().unwrap().push(fruit.clone());
        Ok(())
    }

    async fn update(
        &self,
        id: Uuid,
        draft: &FruitDraft,
        updated_at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Fruit>> {
        self.touch();
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.iter_mut().find(|f| f.id == id).map(|f| {
            f.name = draft.name.clone();
            f.quantity = draft.quantity;
            f.price = draft.price;
            f.updated_at = updated_at;
            f.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        self.touch();
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|f| f.id != id);
        Ok(rows.len() != before)
    }
}

// ---------- users + outbox ----------

#[derive(Debug, Clone)]
pub struct OutboxEntry {
    pub id: i64,
    pub payload: Value,
    pub published: bool,
    pub attempts: i32,
    pub last_error: Option<String>,
}

#[derive(Default)]
pub struct MemUsers {
    pub users: Mutex<Vec<User>>,
    pub outbox: Mutex<Vec<OutboxEntry>>,
}

impl MemUsers {
    pub fn outbox(&self) -> Vec<OutboxEntry> {
        self.outbox.lock().unwrap().clone()
    }

    pub fn push_event(&self, payload: Value) -> i64 {
        let mut outbox = self.outbox.lock().unwrap();
        let id = outbox.len() as i64 + 1;
        outbox.push(OutboxEntry {
            id,
            payload,
            published: false,
            attempts: 0,
            last_error: None,
        });
        id
    }
}

#[async_trait]
impl UsersRepository for MemUsers {
    async fn list(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_with_event(
        &self,
        user: &User,
        event: &UserEvent,
    ) -> anyhow::Result<InsertOutcome> {
        {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|u| u.username == user.username) {
                return Ok(InsertOutcome::UsernameTaken);
            }
            users.push(user.clone());
        }
        self.push_event(event.to_value()?);
        Ok(InsertOutcome::Inserted)
    }
}

#[async_trait]
impl OutboxStore for MemUsers {
    async fn pending(&self, limit: usize) -> anyhow::Result<Vec<OutboxRecord>> {
        Ok(self
            .outbox
            .lock()
            .unwrap()
            .iter()
            .filter(|e| !e.published)
            .take(limit)
            .map(|e| OutboxRecord {
                id: e.id,
                payload: e.payload.clone(),
                attempts: e.attempts,
            })
            .collect())
    }

    async fn mark_published(&self, id: i64) -> anyhow::Result<()> {
        let mut outbox = self.outbox.lock().unwrap();
        if let Some(e) = outbox.iter_mut().find(|e| e.id == id) {
            e.published = true;
            e.attempts += 1;
            e.last_error = None;
        }
        Ok(())
    }

    async fn mark_failed(&self, id: i64, error: &str) -> anyhow::Result<()> {
        let mut outbox = self.outbox.lock().unwrap();
        if let Some(e) = outbox.iter_mut().find(|e| e.id == id) {
            e.attempts += 1;
            e.last_error = Some(error.to_string());
        }
        Ok(())
    }
}

// ---------- cache ----------

#[derive(Default)]
pub struct MemCache {
    value: Mutex<Option<Vec<Fruit>>>,
    generation: AtomicU64,
    pub hits: AtomicUsize,
    pub invalidations: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_invalidate: AtomicBool,
}

impl MemCache {
    pub fn is_populated(&self) -> bool {
        self.value.lock().unwrap().is_some()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    /// What a concurrent write does to the cache.
    pub fn bump(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.value.lock().unwrap() = None;
    }
}

#[async_trait]
impl FruitListCache for MemCache {
    async fn get(&self) -> Result<Option<Vec<Fruit>>, CacheError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("connection refused".into()));
        }
        let v = self.value.lock().unwrap().clone();
        if v.is_some() {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
        Ok(v)
    }

    async fn generation(&self) -> Result<u64, CacheError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("connection refused".into()));
        }
        Ok(self.generation.load(Ordering::SeqCst))
    }

    async fn put(&self, generation: u64, fruits: &[Fruit]) -> Result<bool, CacheError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("connection refused".into()));
        }
        let mut value = self.value.lock().unwrap();
        if self.generation.load(Ordering::SeqCst) != generation {
            return Ok(false);
        }
        *value = Some(fruits.to_vec());
        Ok(true)
    }

    async fn invalidate(&self) -> Result<(), CacheError> {
        if self.fail_invalidate.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("connection refused".into()));
        }
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        self.bump();
        Ok(())
    }
}

// ---------- publisher ----------

#[derive(Default)]
pub struct RecordingPublisher {
    pub sent: Mutex<Vec<Vec<u8>>>,
    /// Number of publishes that succeed before every further one fails.
    pub fail_after: Mutex<Option<usize>>,
}

impl RecordingPublisher {
    pub fn failing_after(n: usize) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_after: Mutex::new(Some(n)),
        }
    }

    pub fn heal(&self) {
        *self.fail_after.lock().unwrap() = None;
    }

    pub fn sent_json(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|b| serde_json::from_slice(b).unwrap())
            .collect()
    }
}

#[async_trait]
impl UserEventPublisher for RecordingPublisher {
    async fn publish(&self, body: &[u8]) -> anyhow::Result<()> {
        let mut sent = self.sent.lock().unwrap();
        if let Some(limit) = *self.fail_after.lock().unwrap() {
            if sent.len() >= limit {
                anyhow::bail!("broker did not confirm");
            }
        }
        sent.push(body.to_vec());
        Ok(())
    }
}

// ---------- router harness ----------

pub struct Harness {
    pub fruits: Arc<MemFruits>,
    pub users: Arc<MemUsers>,
    pub cache: Arc<MemCache>,
    pub keys: JwtKeys,
    pub router: Router,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(StoreConfig {
            bcrypt_cost: 4,
            ..StoreConfig::default()
        })
        .await
    }

    pub async fn with_config(cfg: StoreConfig) -> Self {
        let fruits = Arc::new(MemFruits::default());
        let users = Arc::new(MemUsers::default());
        let cache = Arc::new(MemCache::default());

        let now = Utc::now();
        let hash = PasswordHasher::new(4).hash(ADMIN_PASSWORD).await.unwrap();
        users.users.lock().unwrap().push(User {
            id: Uuid::new_v4(),
            username: "admin".into(),
            password_hash: hash,
            role: Role::Admin,
            created_at: now,
            updated_at: now,
        });

        let store = Store::new(
            StoreDeps {
                fruits: fruits.clone(),
                users: users.clone(),
                cache: cache.clone(),
                keys: JwtKeys::new(SECRET, Duration::from_secs(3600)).unwrap(),
            },
            &cfg,
        );
        let router = with_standard_layers(store.router(), &HttpOptions::default());

        Self {
            fruits,
            users,
            cache,
            keys: JwtKeys::new(SECRET, Duration::from_secs(3600)).unwrap(),
            router,
        }
    }

    pub fn token(&self, role: Option<&str>) -> String {
        let now = Utc::now().timestamp();
        self.keys
            .sign(&Claims {
                sub: Uuid::new_v4().to_string(),
                role: role.map(str::to_string),
                iat: now,
                exp: now + 600,
            })
            .unwrap()
    }

    pub fn admin(&self) -> String {
        self.token(Some("admin"))
    }

    pub fn user(&self) -> String {
        self.token(Some("user"))
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(v) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Response {
            status,
            headers,
            json,
        }
    }
}

pub struct Response {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub json: Value,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
