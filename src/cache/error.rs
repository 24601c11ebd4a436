use std::path::PathBuf;

use thiserror::Error;

use super::types::InvalidIdentifier;
use crate::config::ConfigError;
use crate::remote::RemoteError;
use crate::storage::DiskError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
/// Errors returned by the tiered cache.
///
/// `NotFound` means the data is absent everywhere; every other variant is an
/// infrastructure failure.
pub enum CacheError {
    /// The remote does not know the store or key.
    #[error("not found: store={store}, key={}", .key.as_deref().unwrap_or("<listing>"))]
    NotFound {
        /// Store id.
        store: String,
        /// Entry key, `None` for listings.
        key: Option<String>,
    },

    /// A cache file exists but could not be decoded.
    #[error("corrupt cache entry {path}: {reason}")]
    CorruptEntry {
        /// File path.
        path: PathBuf,
        /// Decoder message.
        reason: String,
    },

    /// Filesystem failure other than a missing file.
    #[error("storage error: {message}")]
    Storage {
        /// Path being accessed, if known.
        path: Option<PathBuf>,
        /// Error message.
        message: String,
    },

    /// Remote failure other than a missing store or key.
    #[error("remote error: {0}")]
    Remote(RemoteError),

    /// Storage root or settings are unusable.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Store id or key rejected before any lookup.
    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidIdentifier),
}

impl CacheError {
    /// Returns `true` if the data is absent everywhere.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound { .. })
    }

    /// Returns `true` for failures of the cache's own machinery (disk, remote, config).
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            CacheError::CorruptEntry { .. }
                | CacheError::Storage { .. }
                | CacheError::Remote(_)
                | CacheError::Configuration(_)
        )
    }
}

impl From<RemoteError> for CacheError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound { store, key } => CacheError::NotFound { store, key },
            other => CacheError::Remote(other),
        }
    }
}

impl From<DiskError> for CacheError {
    fn from(err: DiskError) -> Self {
        match err {
            DiskError::Corrupt { path, reason } => CacheError::CorruptEntry { path, reason },
            DiskError::Configuration(e) => CacheError::Configuration(e),
            DiskError::NotFound { path } => CacheError::Storage {
                message: format!("file not found: {}", path.display()),
                path: Some(path),
            },
            DiskError::Serialization { path, reason } => CacheError::Storage {
                path: Some(path),
                message: reason,
            },
            DiskError::Io { path, message } => CacheError::Storage {
                path: Some(path),
                message,
            },
        }
    }
}

/// Convenience result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
