//! Identifiers, cache keys and lookup results shared by both tiers.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::constants::RESERVED_PREFIX;

/// A store id or entry key that cannot be used as a cache path component.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid identifier '{value}': {reason}")]
pub struct InvalidIdentifier {
    pub value: String,
    pub reason: &'static str,
}

fn validate_component(value: &str) -> Result<(), InvalidIdentifier> {
    let reason = if value.is_empty() {
        Some("must not be empty")
    } else if value == "." || value == ".." {
        Some("must not be a relative path component")
    } else if value.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else if value.contains('\0') {
        Some("must not contain NUL bytes")
    } else if value.starts_with(RESERVED_PREFIX) {
        Some("must not start with '.'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(InvalidIdentifier {
            value: value.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Validates `value` as a single safe path component.
            pub fn new(value: impl Into<String>) -> Result<Self, InvalidIdentifier> {
                let value = value.into();
                validate_component(&value)?;
                Ok(Self(value))
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = InvalidIdentifier;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = InvalidIdentifier;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<String> for $name {
            type Error = InvalidIdentifier;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

identifier!(
    /// Identifier of a logical store (namespace) on the remote source.
    StoreId
);

identifier!(
    /// Identifier of an entry within a store.
    EntryKey
);

/// Memory tier key: a single entry or a store's key listing.
///
/// The variants never compare equal, so an entry whose key happens to equal its store id
/// can't be served from the listing slot (or the other way round).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Entry { store: StoreId, key: EntryKey },
    Listing { store: StoreId },
}

impl CacheKey {
    pub fn entry(store: &StoreId, key: &EntryKey) -> Self {
        CacheKey::Entry {
            store: store.clone(),
            key: key.clone(),
        }
    }

    pub fn listing(store: &StoreId) -> Self {
        CacheKey::Listing {
            store: store.clone(),
        }
    }

    /// Returns the store this key belongs to.
    #[inline]
    pub fn store(&self) -> &StoreId {
        match self {
            CacheKey::Entry { store, .. } | CacheKey::Listing { store } => store,
        }
    }

    #[inline]
    pub fn is_listing(&self) -> bool {
        matches!(self, CacheKey::Listing { .. })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Entry { store, key } => write!(f, "{}:{}", store, key),
            CacheKey::Listing { store } => write!(f, "{}", store),
        }
    }
}

/// Keys known to exist in a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyListing(Vec<String>);

impl KeyListing {
    pub fn new(keys: Vec<String>) -> Self {
        Self(keys)
    }

    pub fn keys(&self) -> &[String] {
        &self.0
    }

    pub fn into_keys(self) -> Vec<String> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| k == key)
    }
}

impl From<Vec<String>> for KeyListing {
    fn from(keys: Vec<String>) -> Self {
        Self(keys)
    }
}

impl FromIterator<String> for KeyListing {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A value held by the memory tier.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedItem {
    Value(Arc<Value>),
    Listing(Arc<KeyListing>),
}

impl CachedItem {
    pub fn value(value: Value) -> Self {
        CachedItem::Value(Arc::new(value))
    }

    pub fn listing(listing: KeyListing) -> Self {
        CachedItem::Listing(Arc::new(listing))
    }
}

/// Tier that served a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTier {
    Memory,
    Disk,
    Remote,
}

impl CacheTier {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTier::Memory => "HIT_MEMORY",
            CacheTier::Disk => "HIT_DISK",
            CacheTier::Remote => "MISS_REMOTE",
        }
    }

    /// Returns `true` if a cache tier (not the remote) answered.
    #[inline]
    pub fn is_hit(&self) -> bool {
        !matches!(self, CacheTier::Remote)
    }
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A looked-up value together with the tier that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<T> {
    value: T,
    source: CacheTier,
}

impl<T> Lookup<T> {
    pub fn new(value: T, source: CacheTier) -> Self {
        Self { value, source }
    }

    #[inline]
    pub fn source(&self) -> CacheTier {
        self.source
    }

    #[inline]
    pub fn value(&self) -> &T {
        &self.value
    }

    #[inline]
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        Lookup {
            value: f(self.value),
            source: self.source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identifier_accepts_hex_ids() {
        let id = StoreId::new("7f3a9c0e").expect("valid");
        assert_eq!(id.as_str(), "7f3a9c0e");
        assert_eq!(id.to_string(), "7f3a9c0e");
    }

    #[test]
    fn test_identifier_rejects_path_tricks() {
        for bad in ["", ".", "..", "a/b", "a\\b", ".keys", ".hidden", "nul\0byte"] {
            assert!(EntryKey::new(bad).is_err(), "{bad:?} should be rejected");
            assert!(StoreId::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_identifier_allows_inner_dots() {
        assert!(EntryKey::new("config.json").is_ok());
        assert!(EntryKey::new("a..b").is_ok());
    }

    #[test]
    fn test_listing_key_never_equals_entry_key() {
        let store = StoreId::new("S1").unwrap();
        let key = EntryKey::new("S1").unwrap();

        let listing = CacheKey::listing(&store);
        let entry = CacheKey::entry(&store, &key);

        assert_ne!(listing, entry);

        let set: HashSet<_> = [listing.clone(), entry.clone()].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(listing.is_listing());
        assert!(!entry.is_listing());
    }

    #[test]
    fn test_cache_key_display() {
        let store = StoreId::new("S1").unwrap();
        let key = EntryKey::new("K1").unwrap();

        assert_eq!(CacheKey::entry(&store, &key).to_string(), "S1:K1");
        assert_eq!(CacheKey::listing(&store).to_string(), "S1");
        assert_eq!(CacheKey::entry(&store, &key).store(), &store);
    }

    #[test]
    fn test_key_listing_serializes_as_array() {
        let listing = KeyListing::new(vec!["a".into(), "b".into()]);
        let json = serde_json::to_string(&listing).unwrap();
        assert_eq!(json, r#"["a","b"]"#);
        assert!(listing.contains("b"));
        assert_eq!(listing.len(), 2);
    }

    #[test]
    fn test_cache_tier_is_hit() {
        assert!(CacheTier::Memory.is_hit());
        assert!(CacheTier::Disk.is_hit());
        assert!(!CacheTier::Remote.is_hit());
        assert_eq!(format!("{}", CacheTier::Disk), "HIT_DISK");
    }
}
