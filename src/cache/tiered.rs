//! Tiered read-through cache: memory, then disk, then the remote source.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use super::error::{CacheError, CacheResult};
use super::flight::FlightMap;
use super::memory::MemoryTier;
use super::stats::{CacheStats, StatsSnapshot};
use super::types::{CacheKey, CacheTier, CachedItem, EntryKey, KeyListing, Lookup, StoreId};
use crate::config::{Config, CorruptEntryPolicy, RemoteConfig, RemoteConfigHandle, RemoteConfigOverrides};
use crate::paths::PathResolver;
use crate::remote::{RemoteSource, RpcRemoteSource};
use crate::storage::{DiskError, DiskResult, DiskTier};
use crate::subscription::ChangeSubscription;
#[cfg(any(test, feature = "mock"))]
use crate::remote::MockRemoteSource;
#[cfg(any(test, feature = "mock"))]
use crate::subscription::ChangeFeed;

type Loaded = CacheResult<(CachedItem, CacheTier)>;

/// Summary of an invalidation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Invalidation {
    /// Live memory entries removed.
    pub memory_removed: usize,
    /// Whether any file or directory was deleted.
    pub disk_removed: bool,
}

/// Shared handle to a [`DataLayerCache`].
pub type DataLayerCacheHandle<R> = Arc<DataLayerCache<R>>;

/// Read-through cache in front of a [`RemoteSource`].
pub struct DataLayerCache<R: RemoteSource> {
    memory: Arc<MemoryTier>,
    disk: DiskTier,
    remote: R,
    remote_config: RemoteConfigHandle,
    subscription: Arc<dyn ChangeSubscription>,
    registered: Mutex<HashSet<StoreId>>,
    flights: FlightMap<Loaded>,
    write_backs: Mutex<JoinSet<()>>,
    stats: Arc<CacheStats>,
    on_corrupt: CorruptEntryPolicy,
    single_flight: bool,
}

impl<R: RemoteSource> std::fmt::Debug for DataLayerCache<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataLayerCache")
            .field("memory", &self.memory)
            .field("disk", &self.disk)
            .field("on_corrupt", &self.on_corrupt)
            .field("single_flight", &self.single_flight)
            .finish()
    }
}

impl<R: RemoteSource> DataLayerCache<R> {
    /// Builds a cache from `config`.
    ///
    /// `remote_config` must be the handle `remote` reads its settings from, so that
    /// [`configure`](Self::configure) reaches it.
    pub fn new(
        config: &Config,
        remote_config: RemoteConfigHandle,
        remote: R,
        subscription: Arc<dyn ChangeSubscription>,
    ) -> CacheResult<Self> {
        config.validate()?;

        Ok(Self {
            memory: Arc::new(MemoryTier::with_policy(
                config.memory_capacity,
                config.memory_ttl,
            )),
            disk: DiskTier::new(PathResolver::new(config.storage_root.clone())),
            remote,
            remote_config,
            subscription,
            registered: Mutex::new(HashSet::new()),
            flights: FlightMap::new(),
            write_backs: Mutex::new(JoinSet::new()),
            stats: Arc::new(CacheStats::default()),
            on_corrupt: config.on_corrupt,
            single_flight: config.single_flight,
        })
    }

    pub fn memory(&self) -> &MemoryTier {
        &self.memory
    }

    pub fn disk(&self) -> &DiskTier {
        &self.disk
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn remote_config(&self) -> Arc<RemoteConfig> {
        self.remote_config.snapshot()
    }

    /// Current cache directory.
    pub fn cache_directory(&self) -> CacheResult<PathBuf> {
        Ok(self.disk.cache_directory()?)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Merges `overrides` into the remote settings. Requests already in flight keep the
    /// settings they started with.
    pub fn configure(&self, overrides: RemoteConfigOverrides) -> Arc<RemoteConfig> {
        let updated = self.remote_config.apply(&overrides);
        info!(
            endpoint = %updated.endpoint,
            timeout_ms = updated.timeout.as_millis() as u64,
            credentials = updated.credentials.is_some(),
            "Remote configuration updated"
        );
        updated
    }

    /// Returns the value of `key` in `store`.
    pub async fn get_value(&self, store: &str, key: &str) -> CacheResult<Arc<Value>> {
        Ok(self.lookup_value(store, key).await?.into_value())
    }

    /// Returns the keys of `store`.
    pub async fn get_keys(&self, store: &str) -> CacheResult<Arc<KeyListing>> {
        Ok(self.lookup_keys(store).await?.into_value())
    }

    /// Like [`get_value`](Self::get_value), also reporting which tier answered.
    #[instrument(skip(self))]
    pub async fn lookup_value(&self, store: &str, key: &str) -> CacheResult<Lookup<Arc<Value>>> {
        let store = StoreId::new(store)?;
        let key = EntryKey::new(key)?;
        let cache_key = CacheKey::entry(&store, &key);

        let (item, source) = self.lookup(&cache_key).await?;
        match item {
            CachedItem::Value(value) => Ok(Lookup::new(value, source)),
            CachedItem::Listing(_) => Err(kind_mismatch(&cache_key)),
        }
    }

    /// Like [`get_keys`](Self::get_keys), also reporting which tier answered.
    #[instrument(skip(self))]
    pub async fn lookup_keys(&self, store: &str) -> CacheResult<Lookup<Arc<KeyListing>>> {
        let store = StoreId::new(store)?;
        let cache_key = CacheKey::listing(&store);

        let (item, source) = self.lookup(&cache_key).await?;
        match item {
            CachedItem::Listing(listing) => Ok(Lookup::new(listing, source)),
            CachedItem::Value(_) => Err(kind_mismatch(&cache_key)),
        }
    }

    async fn lookup(&self, key: &CacheKey) -> Loaded {
        if let Some(item) = self.memory.get(key) {
            debug!(key = %key, "Memory hit");
            self.stats.record_lookup(CacheTier::Memory);
            return Ok((item, CacheTier::Memory));
        }

        if self.single_flight {
            let flight = self.flights.join(key);
            flight.run(|| self.load(key)).await
        } else {
            self.load(key).await
        }
    }

    async fn load(&self, key: &CacheKey) -> Loaded {
        let store = key.store();
        let epoch = self.memory.epoch(store);

        // A flight that finished just before this one joined has already filled memory.
        if let Some(item) = self.memory.get(key) {
            self.stats.record_lookup(CacheTier::Memory);
            return Ok((item, CacheTier::Memory));
        }

        match self.read_disk(key).await {
            Ok(item) => {
                debug!(key = %key, "Disk hit");
                self.memory.insert_if_current(key.clone(), item.clone(), epoch);
                self.stats.record_lookup(CacheTier::Disk);
                return Ok((item, CacheTier::Disk));
            }
            Err(DiskError::NotFound { .. }) => {
                debug!(key = %key, "Disk miss, fetching from remote");
            }
            Err(DiskError::Corrupt { path, reason })
                if self.on_corrupt == CorruptEntryPolicy::Refetch =>
            {
                warn!(path = %path.display(), reason = %reason, "Corrupt cache file, refetching");
                if let Err(e) = self.delete_file(key).await {
                    warn!(path = %path.display(), error = %e, "Failed to delete corrupt cache file");
                }
            }
            Err(e) => return Err(e.into()),
        }

        let item = self.fetch_remote(key).await?;
        self.stats.record_lookup(CacheTier::Remote);

        if !self.memory.insert_if_current(key.clone(), item.clone(), epoch) {
            debug!(key = %key, "Store invalidated during fetch, not caching");
        }
        self.spawn_write_back(key.clone(), item.clone(), epoch);
        self.register_store(store).await;

        Ok((item, CacheTier::Remote))
    }

    async fn read_disk(&self, key: &CacheKey) -> DiskResult<CachedItem> {
        match key {
            CacheKey::Entry { store, key } => {
                self.disk.read_value(store, key).await.map(CachedItem::value)
            }
            CacheKey::Listing { store } => {
                self.disk.read_listing(store).await.map(CachedItem::listing)
            }
        }
    }

    async fn delete_file(&self, key: &CacheKey) -> DiskResult<bool> {
        match key {
            CacheKey::Entry { store, key } => self.disk.delete(store, Some(key)).await,
            CacheKey::Listing { store } => self.disk.delete_listing(store).await,
        }
    }

    async fn fetch_remote(&self, key: &CacheKey) -> CacheResult<CachedItem> {
        let item = match key {
            CacheKey::Entry { store, key } => {
                CachedItem::value(self.remote.get_value(store, key).await?)
            }
            CacheKey::Listing { store } => {
                CachedItem::listing(self.remote.get_keys(store).await?)
            }
        };
        Ok(item)
    }

    fn spawn_write_back(&self, key: CacheKey, item: CachedItem, epoch: u64) {
        let disk = self.disk.clone();
        let memory = Arc::clone(&self.memory);
        let stats = Arc::clone(&self.stats);

        let mut tasks = self.write_backs.lock();
        while tasks.try_join_next().is_some() {}

        tasks.spawn(async move {
            if memory.epoch(key.store()) != epoch {
                debug!(key = %key, "Store invalidated before write-back, skipping");
                stats.record_write_back_skipped();
                return;
            }

            match persist(&disk, &key, &item).await {
                Ok(path) => {
                    debug!(key = %key, path = %path.display(), "Write-back complete");
                    stats.record_write_back();
                }
                Err(e) => {
                    error!(key = %key, error = %e, "Write-back failed");
                    stats.record_write_back_failure();
                }
            }
        });
    }

    async fn register_store(&self, store: &StoreId) {
        let known = self.registered.lock().contains(store);
        if known {
            return;
        }

        match self.subscription.register_store(store).await {
            Ok(()) => {
                self.registered.lock().insert(store.clone());
                debug!(store = %store, "Subscribed to store changes");
            }
            Err(e) => {
                warn!(store = %store, error = %e, "Failed to subscribe to store changes");
            }
        }
    }

    /// Waits for every pending write-back. Returns how many were awaited.
    pub async fn flush_write_backs(&self) -> usize {
        let mut tasks = std::mem::take(&mut *self.write_backs.lock());

        let mut flushed = 0;
        while let Some(result) = tasks.join_next().await {
            flushed += 1;
            if let Err(e) = result {
                error!(error = %e, "Write-back task failed");
                self.stats.record_write_back_failure();
            }
        }
        flushed
    }

    /// Removes `key` (or the whole store when `key` is `None`) from both tiers.
    ///
    /// Deleting something that isn't cached is not an error. Disk failures are logged and
    /// reported as `disk_removed: false`.
    #[instrument(skip(self))]
    pub async fn invalidate(&self, store: &str, key: Option<&str>) -> CacheResult<Invalidation> {
        let store = StoreId::new(store)?;
        let key = key.map(EntryKey::new).transpose()?;
        Ok(self.invalidate_ids(&store, key.as_ref()).await)
    }

    async fn invalidate_ids(&self, store: &StoreId, key: Option<&EntryKey>) -> Invalidation {
        let mut memory_removed = self.evict(store, key);

        let disk_removed = match self.disk.delete(store, key).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(store = %store, error = %e, "Failed to delete cached files");
                false
            }
        };

        // Second pass drops anything refilled from disk while the files were being deleted.
        memory_removed += self.evict(store, key);

        self.stats.record_invalidation();
        info!(
            store = %store,
            key = key.map(EntryKey::as_str),
            memory_removed,
            disk_removed,
            "Invalidated"
        );

        Invalidation {
            memory_removed,
            disk_removed,
        }
    }

    fn evict(&self, store: &StoreId, key: Option<&EntryKey>) -> usize {
        match key {
            Some(key) => usize::from(self.memory.remove(&CacheKey::entry(store, key))),
            None => self.memory.purge_store(store),
        }
    }

    /// Empties both tiers.
    #[instrument(skip(self))]
    pub async fn invalidate_all(&self) -> Invalidation {
        let memory_removed = usize::try_from(self.memory.len()).unwrap_or(usize::MAX);
        self.memory.clear();

        let disk_removed = match self.disk.clear().await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, "Failed to clear cache directory");
                false
            }
        };
        self.memory.clear();

        self.stats.record_invalidation();
        info!(memory_removed, disk_removed, "Cleared all cached data");

        Invalidation {
            memory_removed,
            disk_removed,
        }
    }

    /// Change callback: the store changed remotely, drop everything cached for it.
    pub async fn handle_change(&self, store: &StoreId) -> Invalidation {
        debug!(store = %store, "Store change received");
        self.invalidate_ids(store, None).await
    }

    /// Drives [`handle_change`](Self::handle_change) from a change feed.
    ///
    /// The task holds a weak reference and stops once the cache is dropped or the feed
    /// closes. If it falls behind the feed, every store is invalidated.
    pub fn spawn_change_listener(
        self: &Arc<Self>,
        mut changes: broadcast::Receiver<StoreId>,
    ) -> JoinHandle<()>
    where
        R: 'static,
    {
        let cache = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                let event = changes.recv().await;
                let Some(cache) = cache.upgrade() else {
                    debug!("Cache dropped, stopping change listener");
                    break;
                };

                match event {
                    Ok(store) => {
                        cache.handle_change(&store).await;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Change listener lagged, invalidating all stores");
                        cache.invalidate_all().await;
                    }
                    Err(RecvError::Closed) => {
                        debug!("Change feed closed, stopping change listener");
                        break;
                    }
                }
            }
        })
    }
}

impl DataLayerCache<RpcRemoteSource> {
    /// Builds a cache backed by the JSON-RPC remote described in `config.remote`.
    pub fn connect(config: &Config, subscription: Arc<dyn ChangeSubscription>) -> CacheResult<Self> {
        let remote_config = RemoteConfigHandle::new(config.remote.clone());
        let remote = RpcRemoteSource::new(remote_config.clone())?;
        Self::new(config, remote_config, remote, subscription)
    }
}

async fn persist(disk: &DiskTier, key: &CacheKey, item: &CachedItem) -> CacheResult<PathBuf> {
    match (key, item) {
        (CacheKey::Entry { store, key }, CachedItem::Value(value)) => {
            Ok(disk.write_value(store, key, value).await?)
        }
        (CacheKey::Listing { store }, CachedItem::Listing(listing)) => {
            Ok(disk.write_listing(store, listing).await?)
        }
        _ => Err(kind_mismatch(key)),
    }
}

fn kind_mismatch(key: &CacheKey) -> CacheError {
    CacheError::Storage {
        path: None,
        message: format!("cached item for '{}' has the wrong kind", key),
    }
}

#[cfg(any(test, feature = "mock"))]
pub type MockDataLayerCache = DataLayerCache<MockRemoteSource>;

#[cfg(any(test, feature = "mock"))]
impl DataLayerCache<MockRemoteSource> {
    /// Creates a cache rooted at `storage_root` over `remote`, registering stores with `feed`.
    pub fn new_mock(
        storage_root: impl Into<PathBuf>,
        remote: MockRemoteSource,
        feed: Arc<ChangeFeed>,
    ) -> CacheResult<Self> {
        let config = Config {
            storage_root: Some(storage_root.into()),
            ..Config::default()
        };
        Self::new_mock_with_config(&config, remote, feed)
    }

    pub fn new_mock_with_config(
        config: &Config,
        remote: MockRemoteSource,
        feed: Arc<ChangeFeed>,
    ) -> CacheResult<Self> {
        let remote_config = RemoteConfigHandle::new(config.remote.clone());
        Self::new(config, remote_config, remote, feed)
    }
}
