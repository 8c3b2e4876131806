//! TOML-driven runtime configuration.
//!
//! `LogConfig` carries the knobs an operator tunes per deployment: the
//! chain partition served by an appender, the commit retry budget, and the
//! subscription backlog bound. Load from a TOML document:
//!
//! ```toml
//! [chain]
//! partition = "tenant-acme"
//! commit_retries = 3
//!
//! [stream]
//! backlog_capacity = 1024
//! ```

use std::path::Path;

use serde::Deserialize;

use trustlog_contracts::error::{TrustlogError, TrustlogResult};

/// Default commit retry budget for stale-tail conflicts.
pub const DEFAULT_COMMIT_RETRIES: u32 = 3;

/// Default bound on a subscription observer's backlog.
pub const DEFAULT_BACKLOG_CAPACITY: usize = 1024;

/// Chain partition served when none is configured.
pub const DEFAULT_PARTITION: &str = "default";

/// Top-level runtime configuration for the audit core.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// Chain appender settings.
    #[serde(default)]
    pub chain: ChainConfig,

    /// Subscription fan-out settings.
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Settings for the chain appender.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// The chain partition this appender serves. Each partition is an
    /// independent chain with its own sequence space and genesis; the
    /// partition id is committed into every entry hash.
    #[serde(default = "default_partition")]
    pub partition: String,

    /// How many times a commit is retried after a stale-tail conflict
    /// before the conflict is surfaced to the caller.
    #[serde(default = "default_commit_retries")]
    pub commit_retries: u32,
}

/// Settings for the subscription fan-out.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Maximum entries an observer may lag behind before it is
    /// disconnected with an overrun signal.
    #[serde(default = "default_backlog_capacity")]
    pub backlog_capacity: usize,
}

fn default_partition() -> String {
    DEFAULT_PARTITION.to_string()
}

fn default_commit_retries() -> u32 {
    DEFAULT_COMMIT_RETRIES
}

fn default_backlog_capacity() -> usize {
    DEFAULT_BACKLOG_CAPACITY
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            partition: default_partition(),
            commit_retries: default_commit_retries(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            backlog_capacity: default_backlog_capacity(),
        }
    }
}

impl LogConfig {
    /// Parse `s` as TOML and build a `LogConfig`.
    ///
    /// Returns `TrustlogError::ConfigError` if the TOML is malformed or
    /// does not match the expected schema.
    pub fn from_toml_str(s: &str) -> TrustlogResult<Self> {
        let config: LogConfig = toml::from_str(s).map_err(|e| TrustlogError::ConfigError {
            reason: format!("failed to parse config TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML configuration.
    pub fn from_file(path: &Path) -> TrustlogResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| TrustlogError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject values no deployment can run with.
    fn validate(&self) -> TrustlogResult<()> {
        if self.chain.partition.is_empty() {
            return Err(TrustlogError::ConfigError {
                reason: "chain.partition must not be empty".to_string(),
            });
        }
        if self.stream.backlog_capacity == 0 {
            return Err(TrustlogError::ConfigError {
                reason: "stream.backlog_capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
