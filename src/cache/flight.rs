//! In-flight load deduplication.
//!
//! Concurrent cold misses for the same [`CacheKey`] share one `OnceCell`: the first caller
//! runs the load, the others wait for its result.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;

use super::types::CacheKey;

type Slot<T> = Arc<OnceCell<T>>;

pub(crate) struct FlightMap<T> {
    inflight: Mutex<HashMap<CacheKey, Slot<T>>>,
}

impl<T: Clone> FlightMap<T> {
    pub(crate) fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Joins the flight for `key`, starting one if none is pending.
    pub(crate) fn join(&self, key: &CacheKey) -> Flight<'_, T> {
        let slot = Arc::clone(
            self.inflight
                .lock()
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        );
        Flight {
            map: self,
            key: key.clone(),
            slot,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.inflight.lock().len()
    }
}

/// Membership in a pending load. Dropping the last member of a finished flight clears it.
pub(crate) struct Flight<'a, T: Clone> {
    map: &'a FlightMap<T>,
    key: CacheKey,
    slot: Slot<T>,
}

impl<T: Clone> Flight<'_, T> {
    /// Runs `load` if no other member has, otherwise waits for that member's result.
    ///
    /// If the running member is cancelled, a waiting member takes over.
    pub(crate) async fn run<F, Fut>(&self, load: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.slot.get_or_init(load).await.clone()
    }
}

impl<T: Clone> Drop for Flight<'_, T> {
    fn drop(&mut self) {
        // Only finished flights are removed; an abandoned one is picked up by the next caller.
        if !self.slot.initialized() {
            return;
        }
        let mut inflight = self.map.inflight.lock();
        if inflight
            .get(&self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &self.slot))
        {
            inflight.remove(&self.key);
        }
    }
}
