//! Outbox configuration.
//!
//! Every field has a default, so a config document only needs the values it
//! changes:
//!
//! ```json
//! { "storage_key": "outbox:v1", "max_attempts": 8, "auto_retry": true }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::Target;
use crate::outbox::{DEFAULT_STORAGE_KEY, RetryPolicy};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    /// Storage key holding the serialized queue.
    pub storage_key: String,

    /// Remote collection new jobs write to.
    pub target: String,

    pub base_delay_ms: u64,
    pub max_delay_ms: u64,

    /// Attempt ceiling before a job is quarantined.
    pub max_attempts: u32,

    /// Extra save attempts after a failed persist.
    pub save_retries: u32,
    pub save_retry_delay_ms: u64,

    /// Schedule a follow-up drain after a transient failure.
    pub auto_retry: bool,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            target: Target::default().as_str().to_string(),
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            max_attempts: policy.max_attempts,
            save_retries: 2,
            save_retry_delay_ms: 50,
            auto_retry: true,
        }
    }
}

impl OutboxConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.is_empty() {
            return Err(ConfigError::Invalid("storage_key must not be empty".to_string()));
        }
        if self.target.is_empty() {
            return Err(ConfigError::Invalid("target must not be empty".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".to_string()));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "base_delay_ms ({}) exceeds max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_attempts: self.max_attempts,
        }
    }

    pub fn target(&self) -> Target {
        Target::new(self.target.clone())
    }

    pub fn save_retry_delay(&self) -> Duration {
        Duration::from_millis(self.save_retry_delay_ms)
    }
}
