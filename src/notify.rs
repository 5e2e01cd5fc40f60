//! Eviction Notifications
//!
//! A small publish/subscribe channel that a cache uses to announce evictions.
//!
//! # Delivery Model
//!
//! - An observer registered through [`NotificationHub::subscribe`] receives
//!   every eviction published *after* the call returns. Past evictions are
//!   never replayed.
//! - Each published notification reaches each registered observer exactly
//!   once. The order in which observers are called is unspecified.
//! - Delivery is synchronous on the publishing thread.
//! - A panicking observer does not disturb the publisher or the other
//!   observers: the panic is caught, turned into an [`ObserverError`], and
//!   handed to that observer's [`EvictionObserver::on_error`].
//! - When the hub is dropped (together with its cache), every observer still
//!   registered receives [`EvictionObserver::on_completed`] once.
//!
//! # Subscriptions
//!
//! [`Subscription`] is the handle returned by `subscribe`. Calling
//! [`Subscription::unsubscribe`] or dropping the handle removes the observer.
//! Unsubscribing is idempotent and takes effect immediately: if another thread
//! is in the middle of delivering to that observer, `unsubscribe` waits for
//! the call to finish, and nothing is delivered once it returns. A handle only
//! keeps a weak reference to the hub so it goes inert once the cache is gone.
//!
//! Subscribing the same `Arc` twice keeps a single registration. Every
//! registration carries its own id, so a leftover handle can never remove a
//! later registration, even one whose observer happens to reuse the address.
//!
//! # Example
//!
//! ```
//! use lru_notify::notify::{EvictionNotification, EvictionObserver, NotificationHub};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Counter(AtomicUsize);
//!
//! impl EvictionObserver for Counter {
//!     fn on_evicted(&self, _notification: &EvictionNotification) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let hub = NotificationHub::new();
//! let counter = Arc::new(Counter::default());
//! let subscription = hub.subscribe(counter.clone());
//!
//! hub.publish(&EvictionNotification::new("a"));
//! subscription.unsubscribe();
//! hub.publish(&EvictionNotification::new("b"));
//!
//! assert_eq!(counter.0.load(Ordering::SeqCst), 1);
//! ```

use crate::error::ObserverError;
use core::fmt;
use parking_lot::{Mutex, ReentrantMutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{trace, warn};

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

/// Announcement that a key was evicted to make room for a new entry.
///
/// Carries only the key; the evicted value has already been discarded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EvictionNotification {
    evicted_key: String,
}

impl EvictionNotification {
    /// Creates a notification for `evicted_key`.
    pub fn new(evicted_key: impl Into<String>) -> Self {
        EvictionNotification {
            evicted_key: evicted_key.into(),
        }
    }

    /// The key that was evicted.
    pub fn evicted_key(&self) -> &str {
        &self.evicted_key
    }
}

/// Receiver of eviction notifications.
///
/// Methods take `&self` because one observer may be shared by several
/// subscriptions and threads; keep any state behind interior mutability.
///
/// Observers run while the publishing cache holds its lock, so they must not
/// call back into the same cache.
pub trait EvictionObserver: Send + Sync {
    /// Called once per eviction while subscribed.
    fn on_evicted(&self, notification: &EvictionNotification);

    /// Called when this observer's own `on_evicted` panicked.
    fn on_error(&self, _error: &ObserverError) {}

    /// Called once when the channel closes.
    fn on_completed(&self) {}
}

/// Address of the observer's `Arc`, used to keep one registration per
/// observer.
type ObserverKey = usize;

fn observer_key(observer: &Arc<dyn EvictionObserver>) -> ObserverKey {
    Arc::as_ptr(observer) as *const () as usize
}

/// Liveness of one registration, shared by the hub and every handle to it.
///
/// `delivery` is held for the whole of each call into the observer. Turning
/// `active` off under the same lock means no call starts afterwards and none
/// is still running once the switch returns. It is reentrant so an observer
/// can unsubscribe itself from inside `on_evicted`.
struct Gate {
    active: AtomicBool,
    delivery: ReentrantMutex<()>,
}

impl Gate {
    fn new() -> Self {
        Gate {
            active: AtomicBool::new(true),
            delivery: ReentrantMutex::new(()),
        }
    }

    fn is_open(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Returns `true` if this call closed the gate.
    fn close(&self) -> bool {
        let _delivery = self.delivery.lock();
        self.active.swap(false, Ordering::AcqRel)
    }
}

#[derive(Clone)]
struct Registration {
    id: u64,
    observer: Arc<dyn EvictionObserver>,
    gate: Arc<Gate>,
}

/// Registry of observers and the delivery loop.
pub struct NotificationHub {
    observers: Mutex<HashMap<ObserverKey, Registration>>,
    next_id: AtomicU64,
}

impl NotificationHub {
    /// Creates an empty hub.
    ///
    /// Hubs are always shared so that [`Subscription`]s can point back to
    /// them weakly.
    pub fn new() -> Arc<Self> {
        Arc::new(NotificationHub {
            observers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        })
    }

    /// Registers `observer` for every notification published from now on.
    ///
    /// Subscribing an `Arc` that is already registered returns a second handle
    /// to the same registration.
    #[must_use = "dropping the subscription unsubscribes the observer"]
    pub fn subscribe(self: &Arc<Self>, observer: Arc<dyn EvictionObserver>) -> Subscription {
        let key = observer_key(&observer);
        let (id, gate, count) = {
            let mut observers = self.observers.lock();
            let existing = observers
                .get(&key)
                .filter(|registration| registration.gate.is_open())
                .map(|registration| (registration.id, Arc::clone(&registration.gate)));
            let (id, gate) = match existing {
                Some(existing) => existing,
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let gate = Arc::new(Gate::new());
                    observers.insert(
                        key,
                        Registration {
                            id,
                            observer,
                            gate: Arc::clone(&gate),
                        },
                    );
                    (id, gate)
                }
            };
            (id, gate, observers.len())
        };
        trace!(registration = id, observers = count, "observer subscribed");
        Subscription {
            hub: Arc::downgrade(self),
            key,
            id,
            gate,
        }
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .values()
            .filter(|registration| registration.gate.is_open())
            .count()
    }

    /// Delivers `notification` to every registered observer.
    ///
    /// Returns how many observers handled it without panicking.
    pub fn publish(&self, notification: &EvictionNotification) -> usize {
        // Snapshot so observers may unsubscribe from inside `on_evicted`.
        let registrations: Vec<Registration> = self.observers.lock().values().cloned().collect();

        let mut delivered = 0;
        for registration in registrations {
            let _delivery = registration.gate.delivery.lock();
            if !registration.gate.is_open() {
                continue;
            }
            let observer = &registration.observer;
            match panic::catch_unwind(AssertUnwindSafe(|| observer.on_evicted(notification))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    let error =
                        ObserverError::from_panic(notification.evicted_key(), payload.as_ref());
                    warn!(key = notification.evicted_key(), %error, "eviction observer failed");
                    let _ = panic::catch_unwind(AssertUnwindSafe(|| observer.on_error(&error)));
                }
            }
        }
        delivered
    }

    fn remove(&self, key: ObserverKey, id: u64) {
        let count = {
            let mut observers = self.observers.lock();
            if observers.get(&key).map_or(false, |registration| registration.id == id) {
                observers.remove(&key);
            }
            observers.len()
        };
        trace!(registration = id, observers = count, "observer unsubscribed");
    }
}

impl Drop for NotificationHub {
    fn drop(&mut self) {
        let observers = core::mem::take(self.observers.get_mut());
        for registration in observers.into_values() {
            if registration.gate.close() {
                let observer = &registration.observer;
                let _ = panic::catch_unwind(AssertUnwindSafe(|| observer.on_completed()));
            }
        }
    }
}

impl fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationHub")
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Handle to a registration made with [`NotificationHub::subscribe`].
///
/// Dropping the handle unsubscribes. Handles to the same registration share
/// its state: once any of them unsubscribes, all of them report inactive.
pub struct Subscription {
    hub: Weak<NotificationHub>,
    key: ObserverKey,
    id: u64,
    gate: Arc<Gate>,
}

impl Subscription {
    /// Stops delivery to the observer. Calling this more than once is a no-op.
    ///
    /// If another thread is delivering to this observer, waits for that call
    /// to return. No notification reaches the observer after this returns.
    pub fn unsubscribe(&self) {
        if !self.gate.close() {
            return;
        }
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.key, self.id);
        }
    }

    /// Returns `true` until the registration is removed or its hub is dropped.
    pub fn is_active(&self) -> bool {
        self.gate.is_open() && self.hub.strong_count() > 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("registration", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
