//! Memory tier (in-process, bounded, optional TTL).
//!
//! Entries live in a `moka` cache keyed by [`CacheKey`]. A secondary index maps each store to
//! the keys cached for it, so a store-wide purge never scans the whole cache. The index lock
//! also makes a purge atomic: lookups hold it shared, mutations hold it exclusively.
//!
//! Every removal bumps the store's epoch. Fetches that started before the removal carry the
//! old epoch and are refused by [`MemoryTier::insert_if_current`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use parking_lot::RwLock;
use serde_json::Value;

use super::types::{CacheKey, CachedItem, EntryKey, KeyListing, StoreId};
use crate::constants::{DEFAULT_MEMORY_CAPACITY, INDEX_PRUNE_FACTOR};

#[derive(Debug, Default)]
struct StoreSlot {
    keys: HashSet<CacheKey>,
    epoch: u64,
}

#[derive(Debug, Default)]
struct StoreIndex {
    stores: HashMap<StoreId, StoreSlot>,
    tracked: u64,
}

impl StoreIndex {
    fn epoch(&self, store: &StoreId) -> u64 {
        self.stores.get(store).map_or(0, |slot| slot.epoch)
    }
}

/// In-memory tier keyed by [`CacheKey`].
pub struct MemoryTier {
    entries: Cache<CacheKey, CachedItem>,
    index: RwLock<StoreIndex>,
    capacity: u64,
}

impl MemoryTier {
    /// Creates a tier with the default capacity and no TTL.
    pub fn new() -> Self {
        Self::with_policy(DEFAULT_MEMORY_CAPACITY, None)
    }

    /// Creates a tier holding at most `capacity` entries, each expiring `ttl` after insertion.
    pub fn with_policy(capacity: u64, ttl: Option<Duration>) -> Self {
        let mut builder = Cache::builder().max_capacity(capacity);
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }

        Self {
            entries: builder.build(),
            index: RwLock::new(StoreIndex::default()),
            capacity,
        }
    }

    /// Looks up `key`. Expired entries are never returned.
    #[inline]
    pub fn get(&self, key: &CacheKey) -> Option<CachedItem> {
        let _index = self.index.read();
        self.entries.get(key)
    }

    /// Looks up a single entry.
    pub fn get_value(&self, store: &StoreId, key: &EntryKey) -> Option<Arc<Value>> {
        match self.get(&CacheKey::entry(store, key))? {
            CachedItem::Value(value) => Some(value),
            CachedItem::Listing(_) => None,
        }
    }

    /// Looks up a store's key listing.
    pub fn get_listing(&self, store: &StoreId) -> Option<Arc<KeyListing>> {
        match self.get(&CacheKey::listing(store))? {
            CachedItem::Listing(listing) => Some(listing),
            CachedItem::Value(_) => None,
        }
    }

    /// Inserts or replaces `key`, restarting its TTL.
    pub fn insert(&self, key: CacheKey, item: CachedItem) {
        let mut index = self.index.write();
        self.insert_locked(&mut index, key, item);
    }

    /// Inserts only if the store has not been invalidated since `epoch` was read.
    ///
    /// Returns `false` (and leaves the tier untouched) if the epoch moved.
    pub fn insert_if_current(&self, key: CacheKey, item: CachedItem, epoch: u64) -> bool {
        let mut index = self.index.write();
        if index.epoch(key.store()) != epoch {
            return false;
        }
        self.insert_locked(&mut index, key, item);
        true
    }

    /// Removes `key` and bumps its store's epoch. Returns `true` if an entry was present.
    pub fn remove(&self, key: &CacheKey) -> bool {
        let mut index = self.index.write();
        let slot = index.stores.entry(key.store().clone()).or_default();
        slot.epoch += 1;
        let was_indexed = slot.keys.remove(key);
        if was_indexed {
            index.tracked = index.tracked.saturating_sub(1);
        }
        self.entries.remove(key).is_some()
    }

    /// Removes every entry and the listing of `store` in one pass.
    ///
    /// Returns the number of live entries removed.
    pub fn purge_store(&self, store: &StoreId) -> usize {
        let mut index = self.index.write();
        let slot = index.stores.entry(store.clone()).or_default();
        slot.epoch += 1;
        let keys = std::mem::take(&mut slot.keys);
        index.tracked = index.tracked.saturating_sub(keys.len() as u64);

        keys.iter()
            .filter(|key| self.entries.remove(*key).is_some())
            .count()
    }

    /// Removes everything and bumps every known store epoch.
    pub fn clear(&self) {
        let mut index = self.index.write();
        for slot in index.stores.values_mut() {
            slot.keys.clear();
            slot.epoch += 1;
        }
        index.tracked = 0;
        self.entries.invalidate_all();
    }

    /// Returns the current invalidation epoch of `store`.
    #[inline]
    pub fn epoch(&self, store: &StoreId) -> u64 {
        self.index.read().epoch(store)
    }

    /// Returns `true` if `key` is cached.
    #[inline]
    pub fn contains(&self, key: &CacheKey) -> bool {
        let _index = self.index.read();
        self.entries.contains_key(key)
    }

    /// Returns the number of keys indexed under `store`.
    pub fn indexed_len(&self, store: &StoreId) -> usize {
        self.index
            .read()
            .stores
            .get(store)
            .map_or(0, |slot| slot.keys.len())
    }

    /// Returns the (approximate) number of cached entries.
    #[inline]
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Returns `true` if the tier is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.entry_count() == 0
    }

    /// Returns the configured capacity.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Runs any pending maintenance tasks in the underlying cache.
    #[inline]
    pub fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks();
    }

    fn insert_locked(&self, index: &mut StoreIndex, key: CacheKey, item: CachedItem) {
        let slot = index.stores.entry(key.store().clone()).or_default();
        if slot.keys.insert(key.clone()) {
            index.tracked += 1;
        }
        self.entries.insert(key, item);

        if index.tracked > self.capacity.max(1).saturating_mul(INDEX_PRUNE_FACTOR) {
            self.prune_locked(index);
        }
    }

    // Drops index entries for keys moka has already evicted or expired.
    fn prune_locked(&self, index: &mut StoreIndex) {
        let mut tracked = 0u64;
        for slot in index.stores.values_mut() {
            slot.keys.retain(|key| self.entries.contains_key(key));
            tracked += slot.keys.len() as u64;
        }
        index
            .stores
            .retain(|_, slot| !slot.keys.is_empty() || slot.epoch > 0);
        index.tracked = tracked;
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTier")
            .field("entries", &self.entries.entry_count())
            .field("capacity", &self.capacity)
            .finish()
    }
}
