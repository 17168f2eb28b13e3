//! Fruit store API: inventory CRUD with a cached listing, user accounts
//! with bearer-token authorization, and a transactional outbox relaying
//! user events to the message broker.

pub mod api;
pub mod auth;
pub mod config;
pub mod contract;
pub mod domain;
pub mod infra;
pub mod module;

pub use config::StoreConfig;
pub use module::{Store, StoreDeps};
