//! Shared defaults and on-disk layout names.
//!
//! Runtime overrides live in [`crate::config::Config`]; these constants are the fallbacks
//! and the fixed parts of the cache directory layout.

/// Directory under the storage root that holds data layer state.
pub const DATA_LAYER_DIR: &str = "data_layer";

/// Directory under [`DATA_LAYER_DIR`] that holds the disk tier.
pub const CACHE_DIR: &str = "cache";

/// Hidden directory under the home directory used when no root is configured.
pub const DEFAULT_ROOT_DIR: &str = ".datalayer";

/// Network subdirectory appended to [`DEFAULT_ROOT_DIR`].
pub const DEFAULT_NETWORK_DIR: &str = "mainnet";

/// File name of a store's key listing inside its cache directory.
///
/// Entry keys may not start with `.`, so this name can never shadow an entry.
pub const LISTING_FILE_NAME: &str = ".keys";

/// Prefix reserved for cache-internal files inside a store directory.
pub const RESERVED_PREFIX: char = '.';

/// Default remote RPC endpoint.
pub const DEFAULT_RPC_URL: &str = "https://localhost:8562";

/// Default remote request timeout in milliseconds.
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 30_000;

/// Default memory tier capacity (entries).
pub const DEFAULT_MEMORY_CAPACITY: u64 = 10_000;

/// Default buffer size of an in-process change feed.
pub const DEFAULT_CHANGE_FEED_CAPACITY: usize = 256;

/// The memory tier prunes its store index once it tracks this many keys per unit of capacity.
pub const INDEX_PRUNE_FACTOR: u64 = 2;
