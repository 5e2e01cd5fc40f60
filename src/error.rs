//! Error types.
//!
//! Only construction can fail. A missing key is reported as `None` (or as a
//! silent no-op for deletes), never as an error, and observer failures are
//! routed back to the failing observer rather than to the caller.

use std::any::Any;
use thiserror::Error;

/// Errors surfaced to callers of this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CacheError {
    /// The requested capacity was zero or negative.
    #[error("cache capacity must be greater than 0, got {capacity}")]
    InvalidCapacity {
        /// The rejected value.
        capacity: i64,
    },
}

/// Raised when an observer panics while handling an eviction.
///
/// The cache hands this back to the same observer through
/// [`EvictionObserver::on_error`](crate::notify::EvictionObserver::on_error)
/// and carries on delivering to everyone else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("observer failed while handling eviction of {evicted_key:?}: {message}")]
pub struct ObserverError {
    evicted_key: String,
    message: String,
}

impl ObserverError {
    pub(crate) fn from_panic(evicted_key: &str, payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        ObserverError {
            evicted_key: evicted_key.to_string(),
            message,
        }
    }

    /// Key whose eviction was being delivered.
    pub fn evicted_key(&self) -> &str {
        &self.evicted_key
    }

    /// The observer's panic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
