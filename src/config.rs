//! Cache Configuration
//!
//! Two layers of configuration are provided:
//!
//! - [`LruCacheConfig`]: the validated, in-memory configuration a cache is
//!   built from. Its capacity is a `NonZeroUsize`, so a config that exists is
//!   always usable.
//! - [`CacheOptions`]: the raw options section as it appears in a settings
//!   file. It may hold any integer and is turned into an [`LruCacheConfig`] by
//!   [`CacheOptions::validate`].
//!
//! # Examples
//!
//! ```
//! use lru_notify::config::{CacheOptions, LruCacheConfig};
//! use lru_notify::LruCache;
//!
//! let config = LruCacheConfig::new(100).unwrap();
//! let cache: LruCache<String> = LruCache::init(config);
//! assert_eq!(cache.capacity().get(), 100);
//!
//! let options = CacheOptions { cache_size: 0 };
//! assert!(options.validate().is_err());
//! ```

use crate::error::CacheError;
use core::fmt;
use core::num::NonZeroUsize;
use serde::Deserialize;

/// Capacity used when no options are supplied.
pub const DEFAULT_CAPACITY: usize = 10;

/// Configuration for an [`LruCache`](crate::LruCache).
///
/// # Fields
///
/// - `capacity`: Maximum number of entries held before the least recently
///   used one is evicted.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LruCacheConfig {
    /// Maximum number of entries the cache can hold.
    pub capacity: NonZeroUsize,
}

impl LruCacheConfig {
    /// Builds a config, rejecting a zero capacity.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        NonZeroUsize::new(capacity)
            .map(|capacity| LruCacheConfig { capacity })
            .ok_or(CacheError::InvalidCapacity { capacity: 0 })
    }
}

impl Default for LruCacheConfig {
    fn default() -> Self {
        LruCacheConfig {
            capacity: NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl TryFrom<i64> for LruCacheConfig {
    type Error = CacheError;

    fn try_from(capacity: i64) -> Result<Self, Self::Error> {
        usize::try_from(capacity)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(|capacity| LruCacheConfig { capacity })
            .ok_or(CacheError::InvalidCapacity { capacity })
    }
}

impl fmt::Debug for LruCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCacheConfig")
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// The cache options section of a settings file.
///
/// ```json
/// { "cache_size": 25 }
/// ```
///
/// Missing fields fall back to their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Requested capacity. Must be positive to validate.
    pub cache_size: i64,
}

impl Default for CacheOptions {
    fn default() -> Self {
        CacheOptions {
            cache_size: DEFAULT_CAPACITY as i64,
        }
    }
}

impl CacheOptions {
    /// Checks the options and produces a cache config.
    pub fn validate(&self) -> Result<LruCacheConfig, CacheError> {
        LruCacheConfig::try_from(self.cache_size)
    }
}
