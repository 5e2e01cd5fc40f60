//! Shared Cache Instances
//!
//! Some applications want one cache per value type, reachable from anywhere,
//! and built lazily on first use. Instead of a hidden global this module
//! provides [`CacheRegistry`], an explicit object the application creates once
//! and passes to whoever needs a shared cache:
//!
//! ```
//! use lru_notify::CacheRegistry;
//! use std::sync::Arc;
//!
//! let registry = CacheRegistry::new();
//!
//! let names = registry.instance::<String>();
//! names.add_or_update("user:1", "ada".to_string());
//!
//! // Same type, same instance.
//! assert!(Arc::ptr_eq(&names, &registry.instance::<String>()));
//! assert_eq!(registry.instance::<String>().get("user:1"), Some("ada".to_string()));
//! ```
//!
//! Shared instances start with [`DEFAULT_SHARED_CAPACITY`] entries and, unlike
//! [`LruCache`], allow the capacity to be changed at runtime through
//! [`SharedLruCache::set_capacity`].

use crate::cache::{Cache, LruCache};
use crate::config::LruCacheConfig;
use crate::notify::{EvictionObserver, Subscription};
use core::any::{Any, TypeId};
use core::fmt;
use core::num::NonZeroUsize;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

/// Capacity of a freshly built shared instance.
pub const DEFAULT_SHARED_CAPACITY: usize = 10;

/// An [`LruCache`] whose capacity may be changed after construction.
///
/// Lowering the capacity does not evict anything right away. The next insert
/// of a new key evicts from the tail, notifying observers for each entry,
/// until the new entry fits.
pub struct SharedLruCache<V> {
    inner: LruCache<V>,
}

impl<V> SharedLruCache<V> {
    /// Creates an instance holding at most `capacity` entries.
    pub fn new(capacity: NonZeroUsize) -> Self {
        SharedLruCache {
            inner: LruCache::init(LruCacheConfig { capacity }),
        }
    }

    /// Changes the capacity. Takes the same lock as every cache mutation.
    pub fn set_capacity(&self, capacity: NonZeroUsize) {
        self.inner.set_capacity(capacity);
    }

    /// Current capacity.
    pub fn capacity(&self) -> NonZeroUsize {
        self.inner.capacity()
    }

    /// See [`LruCache::add_or_update`].
    pub fn add_or_update(&self, key: impl Into<String>, value: V) {
        self.inner.add_or_update(key, value);
    }

    /// See [`LruCache::delete`].
    pub fn delete(&self, key: &str) {
        self.inner.delete(key);
    }

    /// Number of entries currently held.
    pub fn current_size(&self) -> usize {
        self.inner.current_size()
    }

    /// Snapshot of the keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    /// See [`LruCache::subscribe`].
    #[must_use = "dropping the subscription unsubscribes the observer"]
    pub fn subscribe(&self, observer: Arc<dyn EvictionObserver>) -> Subscription {
        self.inner.subscribe(observer)
    }
}

impl<V: Clone> SharedLruCache<V> {
    /// See [`LruCache::get`].
    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key)
    }
}

impl<V> Default for SharedLruCache<V> {
    fn default() -> Self {
        SharedLruCache::new(default_shared_capacity())
    }
}

impl<V: Clone> Cache<V> for SharedLruCache<V> {
    fn add_or_update(&self, key: String, value: V) {
        self.inner.add_or_update(key, value);
    }

    fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key)
    }

    fn delete(&self, key: &str) {
        self.inner.delete(key);
    }

    fn current_size(&self) -> usize {
        self.inner.current_size()
    }

    fn subscribe(&self, observer: Arc<dyn EvictionObserver>) -> Subscription {
        self.inner.subscribe(observer)
    }
}

impl<V> fmt::Debug for SharedLruCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedLruCache")
            .field("inner", &self.inner)
            .finish()
    }
}

fn default_shared_capacity() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_SHARED_CAPACITY).unwrap_or(NonZeroUsize::MIN)
}

/// One lazily built [`SharedLruCache`] per value type.
pub struct CacheRegistry {
    default_capacity: NonZeroUsize,
    instances: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl CacheRegistry {
    /// Creates an empty registry whose instances start at
    /// [`DEFAULT_SHARED_CAPACITY`].
    pub fn new() -> Self {
        CacheRegistry::with_default_capacity(default_shared_capacity())
    }

    /// Creates an empty registry whose instances start at `capacity`.
    pub fn with_default_capacity(capacity: NonZeroUsize) -> Self {
        CacheRegistry {
            default_capacity: capacity,
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the instance for `V`, building it on first request.
    ///
    /// Concurrent first requests for the same type all receive the same
    /// instance.
    pub fn instance<V>(&self) -> Arc<SharedLruCache<V>>
    where
        V: Send + 'static,
    {
        let mut instances = self.instances.lock();
        let entry = instances.entry(TypeId::of::<V>()).or_insert_with(|| {
            debug!(
                value_type = core::any::type_name::<V>(),
                capacity = self.default_capacity.get(),
                "building shared cache instance"
            );
            let cache: Arc<dyn Any + Send + Sync> =
                Arc::new(SharedLruCache::<V>::new(self.default_capacity));
            cache
        });
        // Entries are keyed by their own value type; a mismatched slot is rebuilt.
        Arc::clone(entry)
            .downcast::<SharedLruCache<V>>()
            .unwrap_or_else(|_| {
                let cache = Arc::new(SharedLruCache::<V>::new(self.default_capacity));
                *entry = cache.clone();
                cache
            })
    }

    /// Number of instances built so far.
    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    /// Returns `true` if no instance has been built yet.
    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        CacheRegistry::new()
    }
}

impl fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("default_capacity", &self.default_capacity)
            .field("instances", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::EvictionNotification;
    use std::thread;

    #[derive(Default)]
    struct Keys(Mutex<Vec<String>>);

    impl EvictionObserver for Keys {
        fn on_evicted(&self, notification: &EvictionNotification) {
            self.0.lock().push(notification.evicted_key().to_string());
        }
    }

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_default_capacity_is_ten() {
        let cache: SharedLruCache<i32> = SharedLruCache::default();
        assert_eq!(cache.capacity().get(), DEFAULT_SHARED_CAPACITY);
        for i in 0..11 {
            cache.add_or_update(i.to_string(), i);
        }
        assert_eq!(cache.current_size(), 10);
        assert_eq!(cache.get("0"), None);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let cache = SharedLruCache::new(cap(2));
        cache.add_or_update("a", 1);
        cache.add_or_update("b", 2);
        assert_eq!(cache.get("a"), Some(1));
        cache.add_or_update("c", 3);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.keys(), vec!["c", "a"]);
    }

    #[test]
    fn test_shrink_takes_effect_on_next_new_key() {
        let cache = SharedLruCache::new(cap(5));
        let keys = Arc::new(Keys::default());
        let _sub = cache.subscribe(keys.clone());
        for i in 0..5 {
            cache.add_or_update(i.to_string(), i);
        }

        cache.set_capacity(cap(2));
        assert_eq!(cache.current_size(), 5);
        assert!(keys.0.lock().is_empty());

        cache.add_or_update("4", 40);
        assert_eq!(cache.current_size(), 5);

        cache.add_or_update("5", 5);
        assert_eq!(cache.current_size(), 2);
        assert_eq!(*keys.0.lock(), vec!["0", "1", "2", "3"]);
        assert_eq!(cache.keys(), vec!["5", "4"]);
    }

    #[test]
    fn test_grow_capacity() {
        let cache = SharedLruCache::new(cap(1));
        cache.add_or_update("a", 1);
        cache.set_capacity(cap(3));
        cache.add_or_update("b", 2);
        cache.add_or_update("c", 3);
        assert_eq!(cache.current_size(), 3);
        assert_eq!(cache.capacity().get(), 3);
    }

    #[test]
    fn test_registry_one_instance_per_type() {
        let registry = CacheRegistry::new();
        assert!(registry.is_empty());

        let ints = registry.instance::<i32>();
        let strings = registry.instance::<String>();
        ints.add_or_update("k", 1);
        strings.add_or_update("k", "v".to_string());

        assert!(Arc::ptr_eq(&ints, &registry.instance::<i32>()));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.instance::<i32>().get("k"), Some(1));
        assert_eq!(registry.instance::<String>().get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_registry_returns_typed_instance_for_each_type() {
        let registry = CacheRegistry::new();
        registry.instance::<u8>().add_or_update("k", 1);
        registry.instance::<u16>().add_or_update("k", 2);
        registry.instance::<String>().add_or_update("k", "three".to_string());
        registry.instance::<Vec<u32>>().add_or_update("k", vec![4]);

        assert_eq!(registry.len(), 4);
        assert_eq!(registry.instance::<u8>().get("k"), Some(1));
        assert_eq!(registry.instance::<u16>().get("k"), Some(2));
        assert_eq!(registry.instance::<String>().get("k"), Some("three".to_string()));
        assert_eq!(registry.instance::<Vec<u32>>().get("k"), Some(vec![4]));
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_registry_default_capacity() {
        let registry = CacheRegistry::with_default_capacity(cap(3));
        assert_eq!(registry.instance::<u8>().capacity().get(), 3);
    }

    #[test]
    fn test_registry_concurrent_first_access() {
        let registry = Arc::new(CacheRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.instance::<u64>())
            })
            .collect();

        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(instances.iter().all(|c| Arc::ptr_eq(c, &instances[0])));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_capacity_change_is_shared() {
        let registry = CacheRegistry::new();
        registry.instance::<i32>().set_capacity(cap(4));
        assert_eq!(registry.instance::<i32>().capacity().get(), 4);
    }
}
