//! In-memory remote source for tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;

use super::RemoteSource;
use super::error::{RemoteError, RemoteResult};
use crate::cache::{EntryKey, KeyListing, StoreId};

#[derive(Default)]
struct MockState {
    values: HashMap<(String, String), Value>,
    listings: HashMap<String, Vec<String>>,
    failure: Option<RemoteError>,
    delay: Option<Duration>,
}

#[derive(Default)]
struct MockInner {
    state: RwLock<MockState>,
    value_calls: AtomicUsize,
    keys_calls: AtomicUsize,
}

#[derive(Clone, Default)]
/// Remote source backed by a `HashMap`, with call counters.
///
/// Clones share state, so a test can keep a handle after moving one into the cache.
pub struct MockRemoteSource {
    inner: Arc<MockInner>,
}

impl MockRemoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value returned for `(store, key)`.
    pub fn insert_value(&self, store: &str, key: &str, value: Value) {
        self.inner
            .state
            .write()
            .values
            .insert((store.to_string(), key.to_string()), value);
    }

    /// Removes the value for `(store, key)`.
    pub fn remove_value(&self, store: &str, key: &str) {
        self.inner
            .state
            .write()
            .values
            .remove(&(store.to_string(), key.to_string()));
    }

    /// Sets the listing returned for `store`.
    pub fn insert_listing<I, S>(&self, store: &str, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner
            .state
            .write()
            .listings
            .insert(store.to_string(), keys.into_iter().map(Into::into).collect());
    }

    /// Makes every call fail with `error` until cleared with `None`.
    pub fn fail_with(&self, error: Option<RemoteError>) {
        self.inner.state.write().failure = error;
    }

    /// Delays every call by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.inner.state.write().delay = delay;
    }

    pub fn value_calls(&self) -> usize {
        self.inner.value_calls.load(Ordering::SeqCst)
    }

    pub fn keys_calls(&self) -> usize {
        self.inner.keys_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.value_calls() + self.keys_calls()
    }

    fn failure_and_delay(&self) -> (Option<RemoteError>, Option<Duration>) {
        let state = self.inner.state.read();
        (state.failure.clone(), state.delay)
    }
}

impl RemoteSource for MockRemoteSource {
    async fn get_value(&self, store: &StoreId, key: &EntryKey) -> RemoteResult<Value> {
        self.inner.value_calls.fetch_add(1, Ordering::SeqCst);

        let (failure, delay) = self.failure_and_delay();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = failure {
            return Err(err);
        }

        self.inner
            .state
            .read()
            .values
            .get(&(store.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| RemoteError::NotFound {
                store: store.to_string(),
                key: Some(key.to_string()),
            })
    }

    async fn get_keys(&self, store: &StoreId) -> RemoteResult<KeyListing> {
        self.inner.keys_calls.fetch_add(1, Ordering::SeqCst);

        let (failure, delay) = self.failure_and_delay();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = failure {
            return Err(err);
        }

        self.inner
            .state
            .read()
            .listings
            .get(store.as_str())
            .cloned()
            .map(KeyListing::new)
            .ok_or_else(|| RemoteError::NotFound {
                store: store.to_string(),
                key: None,
            })
    }
}

impl std::fmt::Debug for MockRemoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRemoteSource")
            .field("value_calls", &self.value_calls())
            .field("keys_calls", &self.keys_calls())
            .finish()
    }
}
