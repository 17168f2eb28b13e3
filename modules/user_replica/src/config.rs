use serde::{Deserialize, Serialize};

/// Settings under `modules.user_replica`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplicaConfig {
    /// Consumer tag announced to the broker.
    pub consumer_tag: String,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            consumer_tag: "user-service".to_string(),
        }
    }
}
