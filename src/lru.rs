//! LRU Core
//!
//! The single-threaded heart of every cache in this crate: a hash index from
//! key to list node, plus a recency list whose head is the most recently used
//! entry and whose tail is the next eviction candidate.
//!
//! # Algorithm
//!
//! ```text
//!   index: "b" ─┐   "a" ─────────┐   "c" ──────────────────┐
//!               ▼                ▼                         ▼
//!   head <-> ("b", vb) <-> ("a", va) <-> ... <-> ("c", vc) <-> tail
//!            most recent                          least recent
//! ```
//!
//! Each node stores its key next to its value, so the tail can be mapped back
//! to its index entry in O(1) during eviction.
//!
//! | Operation      | Effect                                             | Cost |
//! |----------------|----------------------------------------------------|------|
//! | `add_or_update`| insert at head, or overwrite and move to head      | O(1) |
//! | `get`          | move to head, return value                         | O(1) |
//! | `delete`       | unlink and drop                                    | O(1) |
//! | evict          | drop tail (new key at capacity only)               | O(1) |
//!
//! # Eviction Order
//!
//! When a new key arrives at capacity, the tail key is first removed from the
//! index, the eviction is published, and only then is the node unlinked and
//! the new entry linked at the head. Observers therefore see the evicted key
//! as already absent from lookups.
//!
//! # Thread Safety
//!
//! `LruCore` requires `&mut self` for every operation, including `get`. The
//! public caches keep it behind a single mutex so the index and the list are
//! always mutated together.

use crate::list::{Entry, List};
use crate::notify::EvictionNotification;
use core::fmt;
use core::hash::BuildHasher;
use core::num::NonZeroUsize;
use tracing::debug;

#[cfg(feature = "hashbrown")]
use hashbrown::DefaultHashBuilder;
#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::hash_map::RandomState as DefaultHashBuilder;
#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

/// Index plus recency list.
///
/// # Safety
///
/// `map` holds raw pointers into nodes owned by `list`. A pointer is valid
/// while its key is present in `map`: every path that unlinks a node removes
/// its key from `map` first or in the same call.
pub(crate) struct LruCore<V, S = DefaultHashBuilder> {
    capacity: NonZeroUsize,
    list: List<(String, V)>,
    map: HashMap<String, *mut Entry<(String, V)>, S>,
}

// SAFETY: LruCore owns every node its pointers refer to; moving it to another
// thread moves the whole structure.
unsafe impl<V: Send, S: Send> Send for LruCore<V, S> {}

// SAFETY: all mutation goes through &mut self.
unsafe impl<V: Sync, S: Sync> Sync for LruCore<V, S> {}

impl<V> LruCore<V> {
    pub(crate) fn new(capacity: NonZeroUsize) -> Self {
        LruCore::with_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<V, S: BuildHasher> LruCore<V, S> {
    pub(crate) fn with_hasher(capacity: NonZeroUsize, hash_builder: S) -> Self {
        LruCore {
            capacity,
            list: List::new(),
            map: HashMap::with_capacity_and_hasher(capacity.get(), hash_builder),
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    /// Changes the bound. Excess entries stay until the next new key arrives.
    pub(crate) fn set_capacity(&mut self, capacity: NonZeroUsize) {
        debug!(
            from = self.capacity.get(),
            to = capacity.get(),
            len = self.len(),
            "cache capacity changed"
        );
        self.capacity = capacity;
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.list.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Inserts or overwrites `key`.
    ///
    /// A new key arriving while the core is full evicts from the tail first,
    /// handing each evicted key to `on_evict` while its node is still linked
    /// but no longer indexed. Overwriting an existing key never evicts.
    pub(crate) fn add_or_update<F>(&mut self, key: String, value: V, mut on_evict: F)
    where
        F: FnMut(&EvictionNotification),
    {
        if let Some(&node) = self.map.get(&key) {
            // SAFETY: node comes from our map, so it is linked into our list.
            unsafe {
                (*node).value_mut().1 = value;
                self.list.move_to_front(node);
            }
            return;
        }

        while self.list.len() >= self.capacity.get() {
            let Some(last) = self.list.back() else {
                break;
            };
            // SAFETY: `back` returns a linked, value-carrying node of our list.
            let evicted_key = unsafe { &(*last).value().0 };
            self.map.remove(evicted_key.as_str());
            let notification = EvictionNotification::new(evicted_key.as_str());
            debug!(
                key = notification.evicted_key(),
                capacity = self.capacity.get(),
                "evicting least recently used entry"
            );
            on_evict(&notification);
            // SAFETY: the node is still linked; only its index entry is gone.
            drop(unsafe { self.list.unlink(last) });
        }

        let node = self.list.push_front((key.clone(), value));
        self.map.insert(key, node);
    }

    /// Looks up `key` and marks it most recently used.
    pub(crate) fn get(&mut self, key: &str) -> Option<&V> {
        let node = self.map.get(key).copied()?;
        // SAFETY: node comes from our map, so it is linked into our list.
        unsafe {
            self.list.move_to_front(node);
            Some(&(*node).value().1)
        }
    }

    /// Looks up `key` without touching recency.
    pub(crate) fn peek(&self, key: &str) -> Option<&V> {
        let node = self.map.get(key).copied()?;
        // SAFETY: node comes from our map, so it is linked into our list.
        unsafe { Some(&(*node).value().1) }
    }

    /// Removes `key` if present. Never publishes a notification.
    pub(crate) fn delete(&mut self, key: &str) -> Option<V> {
        let node = self.map.remove(key)?;
        // SAFETY: node was indexed until the line above, so it is linked.
        let (_, value) = unsafe { self.list.unlink(node) };
        Some(value)
    }

    /// Keys from most to least recently used.
    pub(crate) fn keys(&self) -> Vec<String> {
        self.list.iter().map(|(k, _)| k.clone()).collect()
    }

    pub(crate) fn clear(&mut self) {
        self.map.clear();
        self.list.clear();
    }
}

impl<V, S> fmt::Debug for LruCore<V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCore")
            .field("capacity", &self.capacity)
            .field("len", &self.list.len())
            .finish()
    }
}
