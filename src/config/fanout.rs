use serde::{Deserialize, Serialize};

use crate::ConfigValidationError;

/// Per-call concurrency of account fetches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Maximum number of account fetches in flight for a single query
    pub max_concurrent_fetches: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 32,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigValidationError::fanout(
                "max_concurrent_fetches cannot be 0",
            ));
        }
        Ok(())
    }
}
