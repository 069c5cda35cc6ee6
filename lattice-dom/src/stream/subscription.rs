//! Subscription types for reactive streams.
//!
//! A Subscription represents a running stream and owns everything needed to
//! stop it: closing sinks, removing listeners, aborting timers and
//! unsubscribing upstream streams.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Unique identifier for a subscriber.
///
/// Each sink gets a unique ID when created. Subjects use it to remove the
/// right observer when a subscription is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

type Teardown = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct State {
    closed: bool,
    teardowns: Vec<Teardown>,
}

/// Handle to a running stream.
///
/// Clones share the same state: unsubscribing any clone stops the stream.
/// Dropping a subscription does not unsubscribe it.
#[derive(Clone, Default)]
pub struct Subscription {
    state: Arc<Mutex<State>>,
}

impl Subscription {
    /// Create an open subscription with no teardown logic yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a subscription that is already closed.
    pub fn closed() -> Self {
        let subscription = Self::new();
        subscription.unsubscribe();
        subscription
    }

    /// Register teardown logic.
    ///
    /// If the subscription is already closed the teardown runs immediately.
    pub fn add<F>(&self, teardown: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock();
        if state.closed {
            drop(state);
            teardown();
            return;
        }
        state.teardowns.push(Box::new(teardown));
    }

    /// Unsubscribe `other` when this subscription is unsubscribed.
    pub fn add_subscription(&self, other: Subscription) {
        if Arc::ptr_eq(&self.state, &other.state) {
            return;
        }
        self.add(move || other.unsubscribe());
    }

    /// Stop the stream and run all teardown logic once.
    pub fn unsubscribe(&self) {
        let teardowns = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            std::mem::take(&mut state.teardowns)
        };

        for teardown in teardowns {
            teardown();
        }
    }

    /// Whether the subscription has been unsubscribed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Get a handle that can unsubscribe without keeping the state alive.
    pub fn downgrade(&self) -> WeakSubscription {
        WeakSubscription(Arc::downgrade(&self.state))
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Subscription")
            .field("closed", &state.closed)
            .field("teardowns", &state.teardowns.len())
            .finish()
    }
}

/// Non-owning handle to a [`Subscription`].
///
/// Sinks hold one of these to unsubscribe their own stream on a terminal
/// notification without forming a reference cycle.
#[derive(Clone, Debug)]
pub struct WeakSubscription(Weak<Mutex<State>>);

impl WeakSubscription {
    /// Unsubscribe if the subscription is still alive.
    pub fn unsubscribe(&self) {
        if let Some(state) = self.0.upgrade() {
            Subscription { state }.unsubscribe();
        }
    }
}
