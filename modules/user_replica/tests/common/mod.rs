#![allow(dead_code)]

use async_trait::async_trait;
use modkit_amqp::{AmqpError, InboundMessage};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use user_events::UserProjection;
use user_replica::{ReplicaUsersRepository, UpsertOutcome};

/// Replica keyed by username with the same stale guard as the Postgres adapter.
#[derive(Default)]
pub struct MemReplica {
    pub rows: Mutex<HashMap<String, UserProjection>>,
    pub writes: Mutex<usize>,
    pub failing: AtomicBool,
}

impl MemReplica {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    pub fn get(&self, username: &str) -> Option<UserProjection> {
        self.rows.lock().unwrap().get(username).cloned()
    }
}

#[async_trait]
impl ReplicaUsersRepository for MemReplica {
    async fn upsert_by_username(&self, user: &UserProjection) -> anyhow::Result<UpsertOutcome> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("connection reset by peer");
        }
        let mut rows = self.rows.lock().unwrap();
        let outcome = match rows.get(&user.username) {
            None => UpsertOutcome::Inserted,
            Some(existing) if existing.updated_at > user.updated_at => {
                return Ok(UpsertOutcome::Stale)
            }
            Some(_) => UpsertOutcome::Updated,
        };
        rows.insert(user.username.clone(), user.clone());
        *self.writes.lock().unwrap() += 1;
        Ok(outcome)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Ack,
    Requeue,
}

/// In-memory delivery that records how it was settled.
pub struct FakeMessage {
    pub tag: u64,
    pub body: Vec<u8>,
    pub log: Arc<Mutex<Vec<(u64, Settled)>>>,
}

#[async_trait]
impl InboundMessage for FakeMessage {
    fn body(&self) -> &[u8] {
        &self.body
    }

    fn delivery_tag(&self) -> u64 {
        self.tag
    }

    fn redelivered(&self) -> bool {
        false
    }

    async fn ack(&self) -> Result<(), AmqpError> {
        self.log.lock().unwrap().push((self.tag, Settled::Ack));
        Ok(())
    }

    async fn requeue(&self) -> Result<(), AmqpError> {
        self.log.lock().unwrap().push((self.tag, Settled::Requeue));
        Ok(())
    }
}

pub fn event(action: &str, username: &str, updated_at: &str) -> Vec<u8> {
    json!({
        "action": action,
        "user": {
            "username": username,
            "role": "user",
            "created_at": "2025-03-01T12:00:00Z",
            "updated_at": updated_at
        }
    })
    .to_string()
    .into_bytes()
}
