//! Cache directory resolution.
//!
//! The disk tier lives at `<storage root>/data_layer/cache`. The root is either configured
//! explicitly or derived from the home directory on every call; nothing is cached here.

use std::path::PathBuf;

use crate::config::{ConfigError, ConfigResult};
use crate::constants::{CACHE_DIR, DATA_LAYER_DIR, DEFAULT_NETWORK_DIR, DEFAULT_ROOT_DIR};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Resolves the storage root and the cache directory beneath it.
pub struct PathResolver {
    storage_root: Option<PathBuf>,
}

impl PathResolver {
    /// Creates a resolver; `None` falls back to `~/.datalayer/mainnet`.
    pub fn new(storage_root: Option<PathBuf>) -> Self {
        Self { storage_root }
    }

    /// Creates a resolver pinned to `root`.
    pub fn fixed(root: impl Into<PathBuf>) -> Self {
        Self::new(Some(root.into()))
    }

    /// Returns the storage root.
    pub fn resolve_storage_root(&self) -> ConfigResult<PathBuf> {
        if let Some(root) = &self.storage_root {
            return Ok(root.clone());
        }

        dirs::home_dir()
            .map(|home| home.join(DEFAULT_ROOT_DIR).join(DEFAULT_NETWORK_DIR))
            .ok_or(ConfigError::StorageRootUnresolved)
    }

    /// Returns `<storage root>/data_layer/cache`.
    pub fn cache_directory(&self) -> ConfigResult<PathBuf> {
        Ok(self
            .resolve_storage_root()?
            .join(DATA_LAYER_DIR)
            .join(CACHE_DIR))
    }
}
