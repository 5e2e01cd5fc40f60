//! Recording Observer
//!
//! [`RecordingObserver`] is the stock [`EvictionObserver`]: it keeps the keys
//! it has seen evicted, in order, and logs each eviction at `info` level.
//!
//! The log belongs to the current subscription. Calling
//! [`RecordingObserver::unsubscribe`] stops delivery *and* clears the log, and
//! so does the cache going away ([`EvictionObserver::on_completed`]).
//!
//! ```
//! use lru_notify::{LruCache, RecordingObserver};
//!
//! let cache = LruCache::new(1).unwrap();
//! let observer = RecordingObserver::new("audit");
//! observer.subscribe(&cache);
//!
//! cache.add_or_update("a", 1);
//! cache.add_or_update("b", 2);
//! assert_eq!(observer.evicted_keys(), vec!["a"]);
//!
//! observer.unsubscribe();
//! assert!(observer.evicted_keys().is_empty());
//! ```

use crate::cache::Cache;
use crate::notify::{EvictionNotification, EvictionObserver, Subscription};
use core::fmt;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Observer that records evicted keys.
pub struct RecordingObserver {
    name: String,
    evicted_keys: Mutex<Vec<String>>,
    subscription: Mutex<Option<Subscription>>,
}

impl RecordingObserver {
    /// Creates an unsubscribed observer. `name` tags its log lines.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(RecordingObserver {
            name: name.into(),
            evicted_keys: Mutex::new(Vec::new()),
            subscription: Mutex::new(None),
        })
    }

    /// Name used in log lines.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subscribes to `cache`, replacing any previous subscription.
    ///
    /// The log is kept; only evictions from now on are appended.
    pub fn subscribe<V, C>(self: &Arc<Self>, cache: &C)
    where
        C: Cache<V> + ?Sized,
    {
        // Release first: re-subscribing to the same cache reuses our identity.
        drop(self.subscription.lock().take());
        let observer: Arc<dyn EvictionObserver> = self.clone();
        let subscription = cache.subscribe(observer);
        *self.subscription.lock() = Some(subscription);
    }

    /// Stops delivery and clears the recorded keys.
    ///
    /// Safe to call when not subscribed.
    pub fn unsubscribe(&self) {
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.unsubscribe();
        }
        self.evicted_keys.lock().clear();
    }

    /// Returns `true` while a live subscription is held.
    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .lock()
            .as_ref()
            .map_or(false, Subscription::is_active)
    }

    /// Keys evicted since subscribing, oldest first.
    pub fn evicted_keys(&self) -> Vec<String> {
        self.evicted_keys.lock().clone()
    }
}

impl EvictionObserver for RecordingObserver {
    fn on_evicted(&self, notification: &EvictionNotification) {
        let mut keys = self.evicted_keys.lock();
        keys.push(notification.evicted_key().to_string());
        info!(
            observer = %self.name,
            count = keys.len(),
            keys = %keys.join(","),
            "evicted keys"
        );
    }

    fn on_completed(&self) {
        self.evicted_keys.lock().clear();
    }
}

impl fmt::Debug for RecordingObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingObserver")
            .field("name", &self.name)
            .field("evicted", &self.evicted_keys.lock().len())
            .finish()
    }
}
