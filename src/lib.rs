//! Datalayer cache library crate (used by the CLI and integration tests).
//!
//! # Public API Surface
//!
//! ## Core Types
//! - [`DataLayerCache`] - Read-through cache (memory, then disk, then remote)
//! - [`Config`], [`RemoteConfigOverrides`] - Settings and runtime overrides
//! - [`CacheError`] - Failure result; [`CacheError::is_not_found`] separates absent data
//!   from infrastructure errors
//!
//! ## Tiers
//! - [`MemoryTier`] - Bounded in-process tier with per-store purge
//! - [`DiskTier`] - One JSON file per entry under `<root>/data_layer/cache`
//! - [`RemoteSource`], [`RpcRemoteSource`] - The authoritative data source
//!
//! ## Change Notifications
//! - [`ChangeSubscription`], [`ChangeFeed`] - Store registration and change delivery
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod paths;
pub mod remote;
pub mod storage;
pub mod subscription;

pub use cache::{
    CacheError, CacheKey, CacheResult, CacheStats, CacheTier, CachedItem, DataLayerCache,
    DataLayerCacheHandle, EntryKey, InvalidIdentifier, Invalidation, KeyListing, Lookup,
    MemoryTier, StatsSnapshot, StoreId,
};
#[cfg(any(test, feature = "mock"))]
pub use cache::MockDataLayerCache;

pub use config::{
    Config, ConfigError, ConfigResult, CorruptEntryPolicy, Credentials, RemoteConfig,
    RemoteConfigHandle, RemoteConfigOverrides,
};
pub use paths::PathResolver;
#[cfg(any(test, feature = "mock"))]
pub use remote::MockRemoteSource;
pub use remote::{RemoteError, RemoteResult, RemoteSource, RpcRemoteSource};
pub use storage::{DiskError, DiskResult, DiskTier};
pub use subscription::{ChangeFeed, ChangeSubscription, SubscriptionError, SubscriptionResult};
