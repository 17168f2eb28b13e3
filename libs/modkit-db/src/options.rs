//! Typed pool options and DSN helpers.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Connection options.
/// Covers the sqlx pool knobs services tune from configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectOpts {
    /// Maximum number of connections in the pool.
    pub max_conns: Option<u32>,
    /// Minimum number of connections in the pool.
    pub min_conns: Option<u32>,
    /// Timeout to acquire a connection from the pool.
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Option<Duration>,
    /// Idle timeout before a connection is closed.
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Option<Duration>,
    /// Maximum lifetime for a connection.
    #[serde(with = "humantime_serde")]
    pub max_lifetime: Option<Duration>,
    /// Test connection health before acquire.
    pub test_before_acquire: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: None,
            max_lifetime: None,
            test_before_acquire: false,
        }
    }
}

impl ConnectOpts {
    /// Pool builder with every set knob applied; unset ones keep sqlx defaults.
    pub fn pool_options(&self) -> PgPoolOptions {
        let mut pool = PgPoolOptions::new().test_before_acquire(self.test_before_acquire);
        if let Some(n) = self.max_conns {
            pool = pool.max_connections(n);
        }
        if let Some(n) = self.min_conns {
            pool = pool.min_connections(n);
        }
        if let Some(t) = self.acquire_timeout {
            pool = pool.acquire_timeout(t);
        }
        if let Some(t) = self.idle_timeout {
            pool = pool.idle_timeout(t);
        }
        if let Some(t) = self.max_lifetime {
            pool = pool.max_lifetime(t);
        }
        pool
    }
}

/// Mask the password of a DSN so it can be logged or printed.
pub fn redact_credentials_in_dsn(dsn: Option<&str>) -> String {
    match dsn {
        Some(dsn) if dsn.contains('@') => {
            if let Ok(mut parsed) = url::Url::parse(dsn) {
                if parsed.password().is_some() {
                    let _ = parsed.set_password(Some("***"));
                }
                parsed.to_string()
            } else {
                "***".to_string()
            }
        }
        Some(dsn) => dsn.to_string(),
        None => "none".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_password_only() {
        let out = redact_credentials_in_dsn(Some("postgres://app:s3cret@db:5432/store"));
        assert_eq!(out, "postgres://app:***@db:5432/store");
        assert!(!out.contains("s3cret"));
    }

    #[test]
    fn passes_through_dsn_without_credentials() {
        assert_eq!(
            redact_credentials_in_dsn(Some("postgres://localhost/store")),
            "postgres://localhost/store"
        );
        assert_eq!(redact_credentials_in_dsn(None), "none");
    }

    #[test]
    fn unparsable_dsn_with_credentials_is_fully_masked() {
        assert_eq!(redact_credentials_in_dsn(Some("user:pw@host")), "***");
    }

    #[test]
    fn connect_opts_parse_humantime_durations() {
        let opts: ConnectOpts = serde_json::from_value(serde_json::json!({
            "max_conns": 4,
            "acquire_timeout": "5s",
            "idle_timeout": "10m"
        }))
        .unwrap();
        assert_eq!(opts.max_conns, Some(4));
        assert_eq!(opts.acquire_timeout, Some(Duration::from_secs(5)));
        assert_eq!(opts.idle_timeout, Some(Duration::from_secs(600)));
        assert!(!opts.test_before_acquire);
    }
}
