//! Disk tier (file-per-entry layout under the cache directory).
//!
//! ```text
//! <cache dir>/<store>/<key>    JSON of a single value
//! <cache dir>/<store>/.keys    JSON array listing the store's keys
//! ```
//!
//! Files are written to a temp file in the same directory and renamed into place, so a
//! reader sees either the previous file or the complete new one.

/// Disk tier error types.
pub mod error;

#[cfg(test)]
mod tests;

pub use error::{DiskError, DiskResult};

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::{EntryKey, KeyListing, StoreId};
use crate::constants::LISTING_FILE_NAME;
use crate::paths::PathResolver;

const TEMP_PREFIX: &str = ".tmp-";

#[derive(Debug, Clone)]
/// Reads, writes and deletes cache files.
pub struct DiskTier {
    paths: PathResolver,
}

impl DiskTier {
    /// Creates a tier whose paths are resolved through `paths` on every call.
    pub fn new(paths: PathResolver) -> Self {
        Self { paths }
    }

    /// Returns the path resolver.
    pub fn paths(&self) -> &PathResolver {
        &self.paths
    }

    /// Returns the current cache directory.
    pub fn cache_directory(&self) -> DiskResult<PathBuf> {
        Ok(self.paths.cache_directory()?)
    }

    /// Returns `<cache dir>/<store>`.
    pub fn store_path(&self, store: &StoreId) -> DiskResult<PathBuf> {
        Ok(self.cache_directory()?.join(store.as_str()))
    }

    /// Returns `<cache dir>/<store>/<key>`.
    pub fn entry_path(&self, store: &StoreId, key: &EntryKey) -> DiskResult<PathBuf> {
        Ok(self.store_path(store)?.join(key.as_str()))
    }

    /// Returns `<cache dir>/<store>/.keys`.
    pub fn listing_path(&self, store: &StoreId) -> DiskResult<PathBuf> {
        Ok(self.store_path(store)?.join(LISTING_FILE_NAME))
    }

    /// Reads the cached value for `(store, key)`.
    pub async fn read_value(&self, store: &StoreId, key: &EntryKey) -> DiskResult<Value> {
        read_json(self.entry_path(store, key)?).await
    }

    /// Reads the cached key listing for `store`.
    pub async fn read_listing(&self, store: &StoreId) -> DiskResult<KeyListing> {
        read_json(self.listing_path(store)?).await
    }

    /// Writes `value` for `(store, key)` and returns the file path.
    pub async fn write_value(
        &self,
        store: &StoreId,
        key: &EntryKey,
        value: &Value,
    ) -> DiskResult<PathBuf> {
        write_json(self.entry_path(store, key)?, value).await
    }

    /// Writes the key listing for `store` and returns the file path.
    pub async fn write_listing(
        &self,
        store: &StoreId,
        listing: &KeyListing,
    ) -> DiskResult<PathBuf> {
        write_json(self.listing_path(store)?, listing).await
    }

    /// Deletes one entry file, or the whole store directory when `key` is `None`.
    ///
    /// Returns `false` if there was nothing to delete.
    pub async fn delete(&self, store: &StoreId, key: Option<&EntryKey>) -> DiskResult<bool> {
        let result = match key {
            Some(key) => {
                let path = self.entry_path(store, key)?;
                tokio::fs::remove_file(&path)
                    .await
                    .map_err(|e| DiskError::io(path, e))
            }
            None => {
                let path = self.store_path(store)?;
                tokio::fs::remove_dir_all(&path)
                    .await
                    .map_err(|e| DiskError::io(path, e))
            }
        };

        match result {
            Ok(()) => Ok(true),
            Err(DiskError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Deletes the listing file of `store`, leaving its entries in place.
    pub async fn delete_listing(&self, store: &StoreId) -> DiskResult<bool> {
        let path = self.listing_path(store)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DiskError::io(path, e)),
        }
    }

    /// Deletes the entire cache directory.
    pub async fn clear(&self) -> DiskResult<bool> {
        let path = self.cache_directory()?;
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DiskError::io(path, e)),
        }
    }

    /// Returns `true` if a cache file exists for `(store, key)`.
    pub async fn contains_value(&self, store: &StoreId, key: &EntryKey) -> DiskResult<bool> {
        let path = self.entry_path(store, key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| DiskError::io(path, e))
    }

    /// Lists stores that currently have a cache directory.
    pub async fn store_ids(&self) -> DiskResult<Vec<StoreId>> {
        let root = self.cache_directory()?;
        let mut dir = match tokio::fs::read_dir(&root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DiskError::io(root, e)),
        };

        let mut stores = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| DiskError::io(&root, e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);

            let name = entry.file_name();
            if is_dir
                && let Some(name) = name.to_str()
                && let Ok(store) = StoreId::new(name)
            {
                stores.push(store);
            }
        }

        stores.sort();
        Ok(stores)
    }
}

async fn read_json<T: DeserializeOwned>(path: PathBuf) -> DiskResult<T> {
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) => return Err(DiskError::io(path, e)),
    };

    serde_json::from_slice(&bytes).map_err(|e| DiskError::Corrupt {
        path,
        reason: e.to_string(),
    })
}

async fn write_json<T: Serialize>(path: PathBuf, value: &T) -> DiskResult<PathBuf> {
    let bytes = serde_json::to_vec(value).map_err(|e| DiskError::Serialization {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let target = path.clone();
    tokio::task::spawn_blocking(move || persist(&target, &bytes))
        .await
        .map_err(|e| DiskError::Io {
            path: path.clone(),
            message: format!("write task failed: {}", e),
        })?
        .map_err(|e| DiskError::io(&path, e))?;

    Ok(path)
}

fn persist(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "cache path has no parent directory",
        )
    })?;
    std::fs::create_dir_all(parent)?;

    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
