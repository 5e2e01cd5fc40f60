//! # lru-notify
//!
//! A bounded, thread-safe, string-keyed LRU cache that tells you what it
//! throws away.
//!
//! When a new key arrives at a full cache, the least recently used entry is
//! evicted and an [`EvictionNotification`] is delivered to every subscribed
//! [`EvictionObserver`] before the insert returns.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           LruCache<V>                            │
//! │                                                                  │
//! │  ┌──────────────── Mutex ────────────────┐   ┌────────────────┐  │
//! │  │ index: key ──▶ node                   │   │NotificationHub │  │
//! │  │ list:  head (MRU) <-> ... <-> (LRU)   │──▶│  observer A    │  │
//! │  └───────────────────────────────────────┘   │  observer B    │  │
//! │                    evict tail ──────────────▶│  ...           │  │
//! │                                              └────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use lru_notify::{LruCache, RecordingObserver};
//!
//! let cache = LruCache::new(3).unwrap();
//! let observer = RecordingObserver::new("evictions");
//! observer.subscribe(&cache);
//!
//! for key in ["1", "2", "3", "4"] {
//!     cache.add_or_update(key, key.len());
//! }
//! assert_eq!(observer.evicted_keys(), vec!["1"]);
//!
//! // Reading refreshes recency: "2" survives the next insert, "3" does not.
//! assert_eq!(cache.get("2"), Some(1));
//! cache.add_or_update("5", 1);
//! assert_eq!(observer.evicted_keys(), vec!["1", "3"]);
//! assert_eq!(cache.keys(), vec!["5", "2", "4"]);
//! ```
//!
//! ## Operations
//!
//! | Operation        | Missing key          | Present key                      |
//! |------------------|----------------------|----------------------------------|
//! | `add_or_update`  | insert (may evict)   | replace value, move to front     |
//! | `get`            | `None`               | clone value, move to front       |
//! | `delete`         | no-op                | remove (not an eviction)         |
//!
//! All three are O(1). `current_size` never exceeds the capacity after an
//! insert of a new key completes.
//!
//! ## Shared Instances
//!
//! [`CacheRegistry`] hands out one [`SharedLruCache`] per value type, built
//! lazily, with a capacity that can be changed at runtime.
//!
//! ## Logging
//!
//! The crate emits `tracing` events (evictions and capacity changes at
//! `debug`, observer failures at `warn`) and never installs a subscriber.
//!
//! ## Modules
//!
//! - [`cache`]: the injectable [`LruCache`] and the [`Cache`] trait
//! - [`shared`]: [`SharedLruCache`] and [`CacheRegistry`]
//! - [`notify`]: notifications, observers and subscriptions
//! - [`observer`]: the stock [`RecordingObserver`]
//! - [`config`]: capacity configuration and the serde options section
//! - [`error`]: error types

/// Doubly linked list backing the recency order.
///
/// Internal infrastructure built on raw pointers; use the caches instead.
pub(crate) mod list;

/// Key index plus recency list, with the eviction protocol.
pub(crate) mod lru;

/// Error types.
pub mod error;

/// Cache configuration.
pub mod config;

/// Eviction notifications, observers and subscriptions.
pub mod notify;

/// Thread-safe LRU cache.
///
/// Provides a fixed-capacity cache that evicts the least recently used entry
/// and publishes each eviction to its observers.
pub mod cache;

/// Shared per-type cache instances with adjustable capacity.
pub mod shared;

/// Stock observer recording evicted keys.
pub mod observer;

pub use cache::{Cache, LruCache};
pub use config::{CacheOptions, LruCacheConfig};
pub use error::{CacheError, ObserverError};
pub use notify::{EvictionNotification, EvictionObserver, NotificationHub, Subscription};
pub use observer::RecordingObserver;
pub use shared::{CacheRegistry, SharedLruCache};
