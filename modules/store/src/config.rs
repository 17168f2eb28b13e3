use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings under `modules.store`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Expiry of the cached fruit listing.
    #[serde(with = "humantime_serde")]
    pub list_cache_ttl: Duration,
    /// Cache key holding the fruit listing.
    pub list_cache_key: String,
    /// bcrypt work factor for new passwords.
    pub bcrypt_cost: u32,
    /// Serve the OpenAPI document at `/openapi.json`.
    pub enable_docs: bool,
    pub outbox: OutboxConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutboxConfig {
    /// Run the relay inside the API process.
    pub relay_enabled: bool,
    /// Pause between polls once the outbox is drained.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Records fetched per poll.
    pub batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            list_cache_ttl: Duration::from_secs(5 * 60),
            list_cache_key: "fruits:all".to_string(),
            bcrypt_cost: 10,
            enable_docs: false,
            outbox: OutboxConfig::default(),
        }
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            relay_enabled: true,
            poll_interval: Duration::from_secs(1),
            batch_size: 100,
        }
    }
}
