use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use user_events::{EventCodecError, UserEnvelope};

use crate::domain::repo::{ReplicaUsersRepository, UpsertOutcome};

/// What a successfully handled message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Upserted {
        username: String,
        outcome: UpsertOutcome,
    },
    /// Well-formed event with an action this service does not handle.
    Skipped { action: String },
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Decode(#[from] EventCodecError),

    #[error("failed to store user '{username}': {source:#}")]
    Storage {
        username: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Settlement of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    /// Negative acknowledgement with redelivery.
    Requeue,
}

impl Disposition {
    pub fn of(result: &Result<Applied, ProcessError>) -> Self {
        match result {
            Ok(_) => Disposition::Ack,
            Err(ProcessError::Decode(_)) | Err(ProcessError::Storage { .. }) => {
                Disposition::Requeue
            }
        }
    }
}

pub struct EventProcessor {
    repo: Arc<dyn ReplicaUsersRepository>,
}

impl EventProcessor {
    pub fn new(repo: Arc<dyn ReplicaUsersRepository>) -> Self {
        Self { repo }
    }

    /// Decode one message body and apply it.
    ///
    /// The payload is only read as a user for upsert actions; any other
    /// action is acknowledged and dropped whatever its payload.
    pub async fn process(&self, body: &[u8]) -> Result<Applied, ProcessError> {
        let envelope = UserEnvelope::decode(body)?;

        if !envelope.action.is_upsert() {
            let action = envelope.action.to_string();
            warn!(%action, username = envelope.username().unwrap_or(""), "unknown action, skipping");
            return Ok(Applied::Skipped { action });
        }

        let user = envelope.projection()?;
        let username = user.username.clone();
        let outcome = self
            .repo
            .upsert_by_username(&user)
            .await
            .map_err(|source| ProcessError::Storage {
                username: username.clone(),
                source,
            })?;
        match outcome {
            UpsertOutcome::Stale => {
                debug!(%username, action = %envelope.action, "stale event ignored")
            }
            _ => info!(%username, action = %envelope.action, ?outcome, "user replicated"),
        }
        Ok(Applied::Upserted { username, outcome })
    }
}
