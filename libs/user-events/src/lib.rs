//! Wire contract for user lifecycle events shared by the API service
//! (producer, via the outbox relay) and the user replica worker (consumer).
//!
//! Messages are JSON objects of the shape
//! `{"action": "create", "user": {"username", "role", "created_at", "updated_at"}}`
//! delivered on the durable queue [`USER_QUEUE`]. Consumers read them through
//! [`UserEnvelope`], which defers the payload until the action is known.
//! The password hash never leaves the API service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Durable queue carrying user lifecycle events.
pub const USER_QUEUE: &str = "user.queue";

/// Content type attached to every published event.
pub const CONTENT_TYPE: &str = "application/json";

/// Action tag of a user event.
///
/// Unknown tags are preserved verbatim so consumers can log and drop them
/// instead of failing to decode the whole message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserAction {
    Create,
    Update,
    Other(String),
}

impl UserAction {
    pub fn as_str(&self) -> &str {
        match self {
            UserAction::Create => "create",
            UserAction::Update => "update",
            UserAction::Other(s) => s.as_str(),
        }
    }

    /// Whether the action results in a write on the consumer side.
    pub fn is_upsert(&self) -> bool {
        matches!(self, UserAction::Create | UserAction::Update)
    }
}

impl From<String> for UserAction {
    fn from(s: String) -> Self {
        match s.as_str() {
            "create" => UserAction::Create,
            "update" => UserAction::Update,
            _ => UserAction::Other(s),
        }
    }
}

impl From<UserAction> for String {
    fn from(a: UserAction) -> Self {
        match a {
            UserAction::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for UserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public projection of a user account carried inside events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProjection {
    pub username: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Event envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEvent {
    pub action: UserAction,
    pub user: UserProjection,
}

#[derive(Debug, Error)]
pub enum EventCodecError {
    #[error("failed to encode user event: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode user event: {0}")]
    Decode(#[source] serde_json::Error),
}

impl UserEvent {
    pub fn new(action: UserAction, user: UserProjection) -> Self {
        Self { action, user }
    }

    pub fn created(user: UserProjection) -> Self {
        Self::new(UserAction::Create, user)
    }

    pub fn encode(&self) -> Result<Vec<u8>, EventCodecError> {
        serde_json::to_vec(self).map_err(EventCodecError::Encode)
    }

    /// JSON value form, as stored in the outbox payload column.
    pub fn to_value(&self) -> Result<serde_json::Value, EventCodecError> {
        serde_json::to_value(self).map_err(EventCodecError::Encode)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, EventCodecError> {
        serde_json::from_value(value).map_err(EventCodecError::Decode)
    }
}

/// Envelope as received by a consumer.
///
/// Only the action is decoded up front; the payload stays raw until the
/// action says how to read it, so events this service does not handle can
/// be dropped whatever their payload looks like.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserEnvelope {
    pub action: UserAction,
    #[serde(default)]
    pub user: serde_json::Value,
}

impl UserEnvelope {
    pub fn decode(body: &[u8]) -> Result<Self, EventCodecError> {
        serde_json::from_slice(body).map_err(EventCodecError::Decode)
    }

    /// Payload read as a full user projection.
    pub fn projection(&self) -> Result<UserProjection, EventCodecError> {
        UserProjection::deserialize(&self.user).map_err(EventCodecError::Decode)
    }

    /// Username carried by the payload, if any.
    pub fn username(&self) -> Option<&str> {
        self.user.get("username").and_then(serde_json::Value::as_str)
    }
}
