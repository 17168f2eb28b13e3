//! Process bootstrap shared by the fruit store binaries: layered
//! configuration, logging and home directory resolution.

pub mod config;
pub mod home_dir;
pub mod logging;

pub use config::{
    default_logging_config, AppConfig, AuthConfig, CacheConfig, CliArgs, DatabaseConfig,
    LoggingConfig, QueueConfig, Section, ServerConfig,
};
