pub mod processor;
pub mod repo;
