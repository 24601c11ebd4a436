use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::types::CacheTier;

/// Lock-free counters updated by the tiered cache.
#[derive(Debug, Default)]
pub struct CacheStats {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    remote_fetches: AtomicU64,
    write_backs: AtomicU64,
    write_back_failures: AtomicU64,
    write_backs_skipped: AtomicU64,
    invalidations: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub remote_fetches: u64,
    pub write_backs: u64,
    pub write_back_failures: u64,
    pub write_backs_skipped: u64,
    pub invalidations: u64,
}

impl CacheStats {
    pub(crate) fn record_lookup(&self, tier: CacheTier) {
        let counter = match tier {
            CacheTier::Memory => &self.memory_hits,
            CacheTier::Disk => &self.disk_hits,
            CacheTier::Remote => &self.remote_fetches,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write_back(&self) {
        self.write_backs.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write_back_failure(&self) {
        self.write_back_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write_back_skipped(&self) {
        self.write_backs_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            remote_fetches: self.remote_fetches.load(Ordering::Relaxed),
            write_backs: self.write_backs.load(Ordering::Relaxed),
            write_back_failures: self.write_back_failures.load(Ordering::Relaxed),
            write_backs_skipped: self.write_backs_skipped.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Lookups answered without contacting the remote.
    pub fn hits(&self) -> u64 {
        self.memory_hits + self.disk_hits
    }
}
