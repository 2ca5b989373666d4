//! Error types of the synchronization layer.

use nestsync_core::{CaptureError, StoreError};
use std::path::PathBuf;
use thiserror::Error;

/// Failure while synchronizing the node log into the tree.
///
/// A merge rejected by tree validation is not an error; it is reported as
/// [`MergeOutcome::Rejected`](crate::MergeOutcome::Rejected).
#[derive(Debug, Error)]
pub enum SyncError {
    /// The storage collaborator failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A captured record could not be decoded
    #[error("invalid capture record: {0}")]
    Capture(#[from] CaptureError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The pipeline no longer accepts work
    #[error("synchronization has shut down")]
    ShutDown,
}

/// Unreadable or invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The TOML could not be parsed
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    /// Create an [`ConfigError::Invalid`]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
