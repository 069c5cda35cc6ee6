//! Observable Implementation
//!
//! An Observable wraps a producer function. Subscribing creates a fresh
//! [`Sink`], hands it to the producer, and returns a [`Subscription`] that
//! closes the sink and tears the producer down.
//!
//! # Terminal Notifications
//!
//! A sink accepts any number of values followed by at most one error or
//! completion. After a terminal notification the sink is closed and the
//! subscription unsubscribes itself, releasing upstream resources.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::subscription::{SubscriberId, Subscription};
use crate::error::Error;

/// One event of a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification<T> {
    /// A value.
    Next(T),
    /// The stream failed; nothing follows.
    Error(Error),
    /// The stream finished; nothing follows.
    Complete,
}

impl<T> Notification<T> {
    /// Whether this notification ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Notification::Next(_))
    }
}

/// Shared callback receiving every notification of a subscription.
pub type Observer<T> = Arc<dyn Fn(Notification<T>) + Send + Sync>;

struct SinkInner<T> {
    id: SubscriberId,
    stopped: AtomicBool,
    handler: Box<dyn Fn(Notification<T>) + Send + Sync>,
}

/// The receiving end a producer pushes notifications into.
pub struct Sink<T> {
    inner: Arc<SinkInner<T>>,
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Sink<T> {
    /// Create a sink around a notification handler.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(Notification<T>) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(SinkInner {
                id: SubscriberId::new(),
                stopped: AtomicBool::new(false),
                handler: Box::new(handler),
            }),
        }
    }

    /// Get the sink's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Push a value. Ignored once the sink is closed.
    pub fn next(&self, value: T) {
        if !self.is_closed() {
            (self.inner.handler)(Notification::Next(value));
        }
    }

    /// Fail the stream. Only the first terminal notification is delivered.
    pub fn error(&self, error: Error) {
        if !self.inner.stopped.swap(true, Ordering::SeqCst) {
            (self.inner.handler)(Notification::Error(error));
        }
    }

    /// Complete the stream. Only the first terminal notification is delivered.
    pub fn complete(&self) {
        if !self.inner.stopped.swap(true, Ordering::SeqCst) {
            (self.inner.handler)(Notification::Complete);
        }
    }

    /// Forward a notification of any kind.
    pub fn notify(&self, notification: Notification<T>) {
        match notification {
            Notification::Next(value) => self.next(value),
            Notification::Error(error) => self.error(error),
            Notification::Complete => self.complete(),
        }
    }

    /// Whether the sink still accepts notifications.
    pub fn is_closed(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Stop accepting notifications without delivering anything.
    pub(crate) fn close(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
    }
}

impl<T> Debug for Sink<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink")
            .field("id", &self.inner.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

type Producer<T> = dyn Fn(Sink<T>) -> Subscription + Send + Sync;

/// A lazy, push-based stream of values of type `T`.
///
/// # Example
///
/// ```rust,ignore
/// let doubled = Observable::from_iter(vec![1, 2, 3]).map(|n| n * 2);
///
/// let subscription = doubled.subscribe(|n| println!("{n}"));
/// // Prints 2, 4, 6
/// subscription.unsubscribe();
/// ```
pub struct Observable<T> {
    producer: Arc<Producer<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            producer: Arc::clone(&self.producer),
        }
    }
}

impl<T> Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an observable from a producer.
    ///
    /// The producer runs once per subscription and returns the teardown
    /// logic for that run.
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn(Sink<T>) -> Subscription + Send + Sync + 'static,
    {
        Self {
            producer: Arc::new(producer),
        }
    }

    /// A stream that completes immediately.
    pub fn empty() -> Self {
        Self::new(|sink| {
            sink.complete();
            Subscription::closed()
        })
    }

    /// A stream that never emits and never completes.
    pub fn never() -> Self {
        Self::new(|_sink| Subscription::new())
    }

    /// A stream of one value, then completion.
    pub fn just(value: T) -> Self {
        Self::new(move |sink| {
            sink.next(value.clone());
            sink.complete();
            Subscription::closed()
        })
    }

    /// A stream of the given values in order, then completion.
    pub fn from_iter<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let values: Vec<T> = values.into_iter().collect();
        Self::new(move |sink| {
            for value in &values {
                if sink.is_closed() {
                    break;
                }
                sink.next(value.clone());
            }
            sink.complete();
            Subscription::closed()
        })
    }

    /// A stream that fails immediately.
    pub fn throw(error: Error) -> Self {
        Self::new(move |sink| {
            sink.error(error.clone());
            Subscription::closed()
        })
    }

    /// Subscribe with a handler receiving every notification.
    pub fn subscribe_with<F>(&self, handler: F) -> Subscription
    where
        F: Fn(Notification<T>) + Send + Sync + 'static,
    {
        let subscription = Subscription::new();
        let weak = subscription.downgrade();
        let sink = Sink::new(move |notification: Notification<T>| {
            let terminal = notification.is_terminal();
            handler(notification);
            if terminal {
                weak.unsubscribe();
            }
        });

        let closer = sink.clone();
        subscription.add(move || closer.close());
        subscription.add_subscription(self.subscribe_sink(sink));
        subscription
    }

    /// Subscribe a shared observer.
    pub fn subscribe_observer(&self, observer: Observer<T>) -> Subscription {
        self.subscribe_with(move |notification| observer(notification))
    }

    /// Subscribe to values only.
    ///
    /// An error reaching this subscriber has nowhere to go and is logged.
    pub fn subscribe<F>(&self, on_next: F) -> Subscription
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.subscribe_with(move |notification| match notification {
            Notification::Next(value) => on_next(value),
            Notification::Error(error) => {
                tracing::error!(%error, "unhandled stream error");
            }
            Notification::Complete => {}
        })
    }

    /// Run the producer against an existing sink.
    pub(crate) fn subscribe_sink(&self, sink: Sink<T>) -> Subscription {
        (self.producer)(sink)
    }
}
