//! Facade configuration via `redstone.toml`.
//!
//! Every section is optional; a missing file section falls back to defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::Encoding;
use crate::error::{Error, Result};

/// Retry policy for connection acquisition.
///
/// Only acquiring a handle is ever retried, since nothing has reached the
/// store at that point. Failures after acquisition are surfaced as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Extra attempts after the first one. `0` disables retrying.
    #[serde(default)]
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each later retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound for the computed delay, before jitter
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_initial_backoff_ms() -> u64 {
    10
}

fn default_max_backoff_ms() -> u64 {
    1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryConfig {
    /// Delay before the first retry.
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Cap on the exponential delay.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Settings for the in-process backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Number of shards for a sharded deployment
    #[serde(default = "default_shards")]
    pub shards: usize,
    /// Maximum simultaneously leased connections; unlimited when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<usize>,
}

fn default_shards() -> usize {
    1
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            shards: default_shards(),
            max_connections: None,
        }
    }
}

/// Facade configuration.
///
/// # Example
///
/// ```toml
/// prefix = "app:"
/// encoding = "json"
///
/// [retry]
/// max_retries = 3
///
/// [backend]
/// shards = 4
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedstoneConfig {
    /// Namespace prefix applied to every key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Payload encoding: `"json"` or `"msgpack"`
    #[serde(default)]
    pub encoding: Encoding,
    /// Connection acquisition retry policy
    #[serde(default)]
    pub retry: RetryConfig,
    /// Backend settings
    #[serde(default)]
    pub backend: BackendConfig,
}

impl RedstoneConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Redstone configuration
#
# Namespace prefix applied to every key (default: none)
# prefix = "app:"

# Payload encoding: "json" (default) or "msgpack"
encoding = "json"

[retry]
# Extra attempts when a connection cannot be acquired (default: 0)
max_retries = 0
initial_backoff_ms = 10
max_backoff_ms = 1000

[backend]
# Number of shards (default: 1)
shards = 1
# max_connections = 64
"#
    }

    /// Parse config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RedstoneConfig = toml::from_str(content)
            .map_err(|e| Error::usage(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::usage(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize this config to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::usage(format!("Failed to serialize config: {}", e)))
    }

    fn validate(&self) -> Result<()> {
        if self.backend.shards == 0 {
            return Err(Error::usage("backend.shards must be at least 1"));
        }
        if self.backend.max_connections == Some(0) {
            return Err(Error::usage("backend.max_connections must be at least 1"));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(Error::usage(
                "retry.initial_backoff_ms must not exceed retry.max_backoff_ms",
            ));
        }
        Ok(())
    }
}
