//! Synchronization configuration.

use crate::errors::ConfigError;
use nestsync_core::DEFAULT_LOG_STREAM;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings of the merge pipeline.
///
/// Loaded from TOML; every field is optional and falls back to its default.
///
/// ```toml
/// log_stream = "nested_set_node_log"
/// shutdown_grace_ms = 800
/// merge_retry_log_threshold = 16
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Name of the log stream whose cursor the merge advances
    pub log_stream: String,
    /// How long shutdown waits for an in-flight merge before cancelling it
    pub shutdown_grace_ms: u64,
    /// Consecutive rejected merges after which a stalled stream is reported
    pub merge_retry_log_threshold: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            log_stream: DEFAULT_LOG_STREAM.to_string(),
            shutdown_grace_ms: 800,
            merge_retry_log_threshold: 16,
        }
    }
}

impl SyncConfig {
    /// Short grace period and early stall reports
    pub fn for_testing() -> Self {
        Self {
            shutdown_grace_ms: 100,
            merge_retry_log_threshold: 3,
            ..Self::default()
        }
    }

    /// Shutdown grace period as a [`Duration`]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_stream.trim().is_empty() {
            return Err(ConfigError::invalid("log_stream", "must not be empty"));
        }
        if self.merge_retry_log_threshold == 0 {
            return Err(ConfigError::invalid(
                "merge_retry_log_threshold",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults_match_documented_values() {
        let config = SyncConfig::default();
        assert_eq!(config.log_stream, "nested_set_node_log");
        assert_eq!(config.shutdown_grace(), Duration::from_millis(800));
        assert_eq!(config.merge_retry_log_threshold, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_documents_keep_defaults() {
        let config = SyncConfig::from_toml_str("shutdown_grace_ms = 50").unwrap();
        assert_eq!(config.shutdown_grace_ms, 50);
        assert_eq!(config.log_stream, DEFAULT_LOG_STREAM);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        assert_matches!(
            SyncConfig::from_toml_str("grace = 5"),
            Err(ConfigError::Parse(_))
        );
        assert_matches!(
            SyncConfig::from_toml_str("log_stream = \"  \""),
            Err(ConfigError::Invalid { field: "log_stream", .. })
        );
        assert_matches!(
            SyncConfig::from_toml_str("merge_retry_log_threshold = 0"),
            Err(ConfigError::Invalid { field: "merge_retry_log_threshold", .. })
        );
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.toml");
        std::fs::write(&path, "log_stream = \"categories\"\n").unwrap();

        let config = SyncConfig::load_from_file(&path).unwrap();
        assert_eq!(config.log_stream, "categories");

        assert_matches!(
            SyncConfig::load_from_file(dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        );
    }
}
