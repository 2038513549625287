use focus_types::DEFAULT_NAMESPACE;
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Leading key segment shared by every key and index.
    pub namespace: String,
    /// Upper bound on concurrent reads during a fan-out.
    pub fanout_concurrency: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            fanout_concurrency: 16,
        }
    }
}

impl CacheConfig {
    pub fn from_toml_str(s: &str) -> CacheResult<Self> {
        toml::from_str(s).map_err(|e| CacheError::Config(e.to_string()))
    }

    /// Fan-out bound, never below one.
    pub fn effective_fanout(&self) -> usize {
        self.fanout_concurrency.max(1)
    }
}
