//! Thread-Safe LRU Cache
//!
//! [`LruCache`] is the injectable cache: construct one per owner and share it
//! by reference or `Arc`. Keys are strings, values are any `V: Clone + Send`.
//!
//! # Locking
//!
//! One `parking_lot::Mutex` guards the key index and the recency list
//! together. Every operation that moves an entry, including `get`, takes that
//! lock, so the index can never point at a node the list has already dropped.
//! A plain `Mutex` is used rather than an `RwLock` because reads are writes
//! here: a hit reorders the list.
//!
//! Eviction notifications are delivered while the lock is held, which keeps
//! them in eviction order across threads. Observers must not call back into
//! the cache that is notifying them.
//!
//! # Example
//!
//! ```
//! use lru_notify::LruCache;
//!
//! let cache = LruCache::new(2).unwrap();
//! cache.add_or_update("apple", 1);
//! cache.add_or_update("banana", 2);
//!
//! // "apple" becomes most recently used
//! assert_eq!(cache.get("apple"), Some(1));
//!
//! // "banana" is evicted
//! cache.add_or_update("cherry", 3);
//! assert_eq!(cache.get("banana"), None);
//! assert_eq!(cache.current_size(), 2);
//! ```

use crate::config::{CacheOptions, LruCacheConfig};
use crate::error::CacheError;
use crate::lru::LruCore;
use crate::notify::{EvictionObserver, NotificationHub, Subscription};
use core::fmt;
use core::hash::BuildHasher;
use core::num::NonZeroUsize;
use parking_lot::Mutex;
use std::sync::Arc;

#[cfg(feature = "hashbrown")]
use hashbrown::DefaultHashBuilder;

#[cfg(not(feature = "hashbrown"))]
use std::collections::hash_map::RandomState as DefaultHashBuilder;

/// Operations shared by every cache in this crate.
///
/// Code that only needs to read, write, or observe a cache (observers, demo
/// drivers) should depend on this trait rather than on a concrete type.
pub trait Cache<V> {
    /// Inserts `value` under `key`, or replaces the existing value.
    fn add_or_update(&self, key: String, value: V);

    /// Returns the value for `key` and marks it most recently used.
    fn get(&self, key: &str) -> Option<V>;

    /// Removes `key` if present.
    fn delete(&self, key: &str);

    /// Number of entries currently held.
    fn current_size(&self) -> usize;

    /// Registers `observer` for eviction notifications.
    fn subscribe(&self, observer: Arc<dyn EvictionObserver>) -> Subscription;
}

/// A bounded LRU cache that announces evictions.
pub struct LruCache<V, S = DefaultHashBuilder> {
    core: Mutex<LruCore<V, S>>,
    hub: Arc<NotificationHub>,
}

impl<V> LruCache<V> {
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// Fails with [`CacheError::InvalidCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        LruCacheConfig::new(capacity).map(Self::init)
    }

    /// Creates a cache from a validated config.
    pub fn init(config: LruCacheConfig) -> Self {
        LruCache::with_hasher(config, DefaultHashBuilder::default())
    }

    /// Creates a cache from raw options, validating them first.
    pub fn from_options(options: &CacheOptions) -> Result<Self, CacheError> {
        options.validate().map(Self::init)
    }
}

impl<V, S: BuildHasher> LruCache<V, S> {
    /// Creates a cache with a custom hash builder for the key index.
    pub fn with_hasher(config: LruCacheConfig, hash_builder: S) -> Self {
        LruCache {
            core: Mutex::new(LruCore::with_hasher(config.capacity, hash_builder)),
            hub: NotificationHub::new(),
        }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> NonZeroUsize {
        self.core.lock().capacity()
    }

    /// Number of entries currently held.
    pub fn current_size(&self) -> usize {
        self.core.lock().len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.core.lock().is_empty()
    }

    /// Inserts `value` under `key`, or replaces the existing value.
    ///
    /// Either way the entry becomes the most recently used. Inserting a new
    /// key into a full cache first evicts the least recently used entry and
    /// notifies every subscribed observer before returning. Replacing a value
    /// never evicts.
    pub fn add_or_update(&self, key: impl Into<String>, value: V) {
        let hub = &self.hub;
        self.core.lock().add_or_update(key.into(), value, |notification| {
            hub.publish(notification);
        });
    }

    /// Runs `f` on the value for `key` while the lock is held.
    ///
    /// Counts as a use of the entry, like [`get`](Self::get), but avoids the
    /// clone.
    pub fn get_with<F, R>(&self, key: &str, f: F) -> Option<R>
    where
        F: FnOnce(&V) -> R,
    {
        self.core.lock().get(key).map(f)
    }

    /// Returns `true` if `key` is present. Does not affect recency.
    pub fn contains_key(&self, key: &str) -> bool {
        self.core.lock().peek(key).is_some()
    }

    /// Removes `key` if present. Removal is not an eviction and is not
    /// announced.
    pub fn delete(&self, key: &str) {
        self.core.lock().delete(key);
    }

    /// Removes every entry without notifying observers.
    pub fn clear(&self) {
        self.core.lock().clear();
    }

    /// Snapshot of the keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.core.lock().keys()
    }

    /// Registers `observer` for evictions that happen after this call.
    ///
    /// Dropping the returned handle unsubscribes.
    #[must_use = "dropping the subscription unsubscribes the observer"]
    pub fn subscribe(&self, observer: Arc<dyn EvictionObserver>) -> Subscription {
        self.hub.subscribe(observer)
    }

    /// Number of subscribed observers.
    pub fn observer_count(&self) -> usize {
        self.hub.observer_count()
    }

    pub(crate) fn set_capacity(&self, capacity: NonZeroUsize) {
        self.core.lock().set_capacity(capacity);
    }
}

impl<V: Clone, S: BuildHasher> LruCache<V, S> {
    /// Returns a clone of the value for `key` and marks it most recently used.
    ///
    /// A missing key is `None`, never an error.
    pub fn get(&self, key: &str) -> Option<V> {
        self.core.lock().get(key).cloned()
    }
}

impl<V: Clone, S: BuildHasher> Cache<V> for LruCache<V, S> {
    fn add_or_update(&self, key: String, value: V) {
        LruCache::add_or_update(self, key, value);
    }

    fn get(&self, key: &str) -> Option<V> {
        LruCache::get(self, key)
    }

    fn delete(&self, key: &str) {
        LruCache::delete(self, key);
    }

    fn current_size(&self) -> usize {
        LruCache::current_size(self)
    }

    fn subscribe(&self, observer: Arc<dyn EvictionObserver>) -> Subscription {
        LruCache::subscribe(self, observer)
    }
}

impl<V, S> fmt::Debug for LruCache<V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("core", &*self.core.lock())
            .field("hub", &self.hub)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::EvictionNotification;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl EvictionObserver for Counter {
        fn on_evicted(&self, _notification: &EvictionNotification) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_new_rejects_zero_capacity() {
        assert_eq!(
            LruCache::<i32>::new(0).unwrap_err(),
            CacheError::InvalidCapacity { capacity: 0 }
        );
        assert!(LruCache::<i32>::from_options(&CacheOptions { cache_size: -1 }).is_err());
        let cache = LruCache::<i32>::from_options(&CacheOptions { cache_size: 4 }).unwrap();
        assert_eq!(cache.capacity().get(), 4);
    }

    #[test]
    fn test_basic_operations() {
        let cache = LruCache::new(3).unwrap();
        assert!(cache.is_empty());

        cache.add_or_update("a", 1);
        cache.add_or_update("b", 2);
        assert_eq!(cache.current_size(), 2);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("z"), None);

        cache.delete("a");
        cache.delete("a");
        assert_eq!(cache.current_size(), 1);
        assert!(!cache.contains_key("a"));
    }

    #[test]
    fn test_get_with() {
        let cache = LruCache::new(2).unwrap();
        cache.add_or_update("key", String::from("hello world"));
        assert_eq!(cache.get_with("key", |v| v.len()), Some(11));
        assert_eq!(cache.get_with("missing", |v| v.len()), None);
    }

    #[test]
    fn test_contains_key_keeps_order() {
        let cache = LruCache::new(2).unwrap();
        cache.add_or_update("a", 1);
        cache.add_or_update("b", 2);
        assert!(cache.contains_key("a"));
        assert_eq!(cache.keys(), vec!["b", "a"]);
    }

    #[test]
    fn test_clear_does_not_notify() {
        let cache = LruCache::new(2).unwrap();
        let counter = Arc::new(Counter::default());
        let _sub = cache.subscribe(counter.clone());
        cache.add_or_update("a", 1);
        cache.add_or_update("b", 2);
        cache.clear();
        assert_eq!(cache.current_size(), 0);
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_through_trait_object() {
        let cache: LruCache<i32> = LruCache::new(1).unwrap();
        let dyn_cache: &dyn Cache<i32> = &cache;
        let counter = Arc::new(Counter::default());
        let _sub = dyn_cache.subscribe(counter.clone());

        dyn_cache.add_or_update("a".to_string(), 1);
        dyn_cache.add_or_update("b".to_string(), 2);
        assert_eq!(dyn_cache.get("a"), None);
        assert_eq!(dyn_cache.get("b"), Some(2));
        dyn_cache.delete("b");
        assert_eq!(dyn_cache.current_size(), 0);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_debug_output() {
        let cache: LruCache<i32> = LruCache::new(5).unwrap();
        let out = format!("{:?}", cache);
        assert!(out.contains("LruCache"));
        assert!(out.contains("capacity: 5"));
    }

    #[test]
    fn test_concurrent_writers_respect_capacity() {
        let cache = Arc::new(LruCache::new(50).unwrap());
        let counter = Arc::new(Counter::default());
        let _sub = cache.subscribe(counter.clone());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..500 {
                        let key = format!("key_{}", (t * 500 + i) % 200);
                        if i % 2 == 0 {
                            cache.add_or_update(key, i);
                        } else {
                            let _ = cache.get(&key);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.current_size() <= 50);
        assert_eq!(cache.keys().len(), cache.current_size());
        assert!(counter.0.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_scoped_threads_share_borrowed_cache() {
        let cache = LruCache::new(16).unwrap();
        let mut pool = scoped_threadpool::Pool::new(4);

        pool.scoped(|scope| {
            for t in 0..4 {
                let cache = &cache;
                scope.execute(move || {
                    for i in 0..100 {
                        cache.add_or_update(format!("t{}_{}", t, i % 8), i);
                    }
                });
            }
        });

        assert_eq!(cache.current_size(), 16);
    }
}
