//! Postgres adapters. Tables are described by `sql/schema.sql`.

mod fruits;
mod outbox;
mod users;

pub use fruits::PgFruitRepository;
pub use outbox::PgOutboxStore;
pub use users::PgUsersRepository;

/// Reference schema of the API database.
pub const SCHEMA_SQL: &str = include_str!("../../../sql/schema.sql");
