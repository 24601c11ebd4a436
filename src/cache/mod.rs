//! Memory tier, shared key types and the tiered read-through cache.

pub mod error;
mod flight;
pub mod memory;
pub mod stats;
pub mod tiered;
pub mod types;


pub use error::{CacheError, CacheResult};
pub use memory::MemoryTier;
pub use stats::{CacheStats, StatsSnapshot};
#[cfg(any(test, feature = "mock"))]
pub use tiered::MockDataLayerCache;
pub use tiered::{DataLayerCache, DataLayerCacheHandle, Invalidation};
pub use types::{
    CacheKey, CacheTier, CachedItem, EntryKey, InvalidIdentifier, KeyListing, Lookup, StoreId,
};
