use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
/// Errors returned by the disk tier.
pub enum DiskError {
    /// No cache file at `path`.
    #[error("cache file not found: {path}")]
    NotFound {
        /// File path.
        path: PathBuf,
    },

    /// File exists but its contents could not be decoded.
    #[error("corrupt cache file {path}: {reason}")]
    Corrupt {
        /// File path.
        path: PathBuf,
        /// Decoder message.
        reason: String,
    },

    /// Value could not be encoded for writing.
    #[error("failed to serialize value for {path}: {reason}")]
    Serialization {
        /// Target path.
        path: PathBuf,
        /// Encoder message.
        reason: String,
    },

    /// Any other filesystem failure.
    #[error("I/O error on {path}: {message}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Cache directory could not be resolved.
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl DiskError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            DiskError::NotFound { path: path.into() }
        } else {
            DiskError::Io {
                path: path.into(),
                message: err.to_string(),
            }
        }
    }

    /// Returns `true` for a plain cache miss.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, DiskError::NotFound { .. })
    }
}

/// Convenience result type for disk tier operations.
pub type DiskResult<T> = Result<T, DiskError>;
