//! Store change notifications.
//!
//! The cache registers every store it fetches from the remote; the change source later
//! reports changed stores, which the cache turns into whole-store invalidations.

pub mod error;


pub use error::{SubscriptionError, SubscriptionResult};

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::cache::StoreId;
use crate::constants::DEFAULT_CHANGE_FEED_CAPACITY;

#[async_trait]
/// Registration side of a change source.
pub trait ChangeSubscription: Send + Sync {
    /// Asks to be notified when `store` changes. Registering twice is a no-op.
    async fn register_store(&self, store: &StoreId) -> SubscriptionResult<()>;
}

/// In-process change source backed by a broadcast channel.
///
/// Notifications are only delivered for stores that were registered first.
pub struct ChangeFeed {
    registered: Mutex<HashSet<StoreId>>,
    sender: broadcast::Sender<StoreId>,
}

impl ChangeFeed {
    /// Creates a feed whose receivers buffer up to `capacity` notifications.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            registered: Mutex::new(HashSet::new()),
            sender,
        }
    }

    /// Returns a new receiver for change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreId> {
        self.sender.subscribe()
    }

    /// Reports that `store` changed.
    ///
    /// Returns `true` if the store was registered and at least one receiver exists.
    pub fn publish(&self, store: &StoreId) -> bool {
        if !self.is_registered(store) {
            debug!(store = %store, "Change for unregistered store ignored");
            return false;
        }
        self.sender.send(store.clone()).is_ok()
    }

    pub fn is_registered(&self, store: &StoreId) -> bool {
        self.registered.lock().contains(store)
    }

    /// Registered stores, sorted.
    pub fn registered_stores(&self) -> Vec<StoreId> {
        let mut stores: Vec<_> = self.registered.lock().iter().cloned().collect();
        stores.sort();
        stores
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CHANGE_FEED_CAPACITY)
    }
}

#[async_trait]
impl ChangeSubscription for ChangeFeed {
    async fn register_store(&self, store: &StoreId) -> SubscriptionResult<()> {
        if self.registered.lock().insert(store.clone()) {
            debug!(store = %store, "Store registered for change notifications");
        }
        Ok(())
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("registered", &self.registered.lock().len())
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}
