mod pg;

pub use pg::PgReplicaUsersRepository;

/// Reference schema of the replica database.
pub const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");
