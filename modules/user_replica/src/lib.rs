//! User replica worker: applies user events from the broker to a
//! service-local copy of the user table.
//!
//! Messages are handled one at a time. Decode and storage failures are
//! returned to the queue; successes and unknown actions are acknowledged.

pub mod config;
pub mod consumer;
pub mod domain;
pub mod infra;

pub use config::ReplicaConfig;
pub use consumer::{run_consumer, ConsumerStats};
pub use domain::processor::{Applied, Disposition, EventProcessor, ProcessError};
pub use domain::repo::{ReplicaUsersRepository, UpsertOutcome};
pub use infra::PgReplicaUsersRepository;
