//! Remote data source (the authoritative key-value service).

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;


pub use client::RpcRemoteSource;
pub use error::{RemoteError, RemoteResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockRemoteSource;

use serde_json::Value;

use crate::cache::{EntryKey, KeyListing, StoreId};

/// Capability the cache needs from the remote source.
pub trait RemoteSource: Send + Sync {
    /// Fetches the value stored under `(store, key)`.
    ///
    /// Fails with [`RemoteError::NotFound`] if the store or key is unknown.
    fn get_value(
        &self,
        store: &StoreId,
        key: &EntryKey,
    ) -> impl std::future::Future<Output = RemoteResult<Value>> + Send;

    /// Fetches the keys currently present in `store`.
    fn get_keys(
        &self,
        store: &StoreId,
    ) -> impl std::future::Future<Output = RemoteResult<KeyListing>> + Send;
}
