//! Execution configuration
//!
//! Loaded from a JSON file; every field is optional.
//!
//! ```text
//! {"stop_on_error": true, "timeout_ms": 5000, "log_level": "trace"}
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;

/// Configuration load failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Flags and limits applied to statement execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Suppress result echo and confirmation prompts
    #[serde(default)]
    pub silent: bool,

    /// Run each statement's sanity check before executing it
    #[serde(default = "default_true")]
    pub sanity_check: bool,

    /// Abort on the first failing statement instead of reporting and continuing
    #[serde(default)]
    pub stop_on_error: bool,

    /// Allow object and array literals in expressions
    #[serde(default = "default_true")]
    pub extended_language: bool,

    /// Render each statement's plan before executing it
    #[serde(default)]
    pub trace: bool,

    /// Per-statement timeout
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Partitions per collection of the local store
    #[serde(default = "default_partition_count")]
    pub partition_count: usize,

    /// Minimum log severity: trace, info, warn or error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Property that holds the key of a self-keying value
    #[serde(default = "default_key_attribute")]
    pub key_attribute: String,
}

fn default_true() -> bool {
    true
}
fn default_partition_count() -> usize {
    7
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_key_attribute() -> String {
    "key".to_string()
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            silent: false,
            sanity_check: true,
            stop_on_error: false,
            extended_language: true,
            trace: false,
            timeout_ms: None,
            partition_count: default_partition_count(),
            log_level: default_log_level(),
            key_attribute: default_key_attribute(),
        }
    }
}

impl QueryConfig {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from JSON text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: QueryConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partition_count == 0 {
            return Err(ConfigError::Invalid(
                "partition_count must be > 0".to_string(),
            ));
        }

        if Severity::parse(&self.log_level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "Invalid log_level: '{}'. Must be one of trace, info, warn, error.",
                self.log_level
            )));
        }

        if self.key_attribute.is_empty() {
            return Err(ConfigError::Invalid(
                "key_attribute must not be empty".to_string(),
            ));
        }

        if self.timeout_ms == Some(0) {
            return Err(ConfigError::Invalid("timeout_ms must be > 0".to_string()));
        }

        Ok(())
    }

    /// Configured log threshold
    pub fn severity(&self) -> Severity {
        Severity::parse(&self.log_level).unwrap_or(Severity::Info)
    }
}
