//! Stream combinators.
//!
//! Each combinator returns a new cold [`Observable`]; subscribing to it
//! subscribes upstream. Errors always propagate downstream unchanged and end
//! the combined stream.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::observable::{Notification, Observable, Sink};
use super::subject::ReplaySubject;
use super::subscription::Subscription;
use crate::error::Result;

/// Forward a terminal notification, or hand the value to `on_next`.
fn forward<T, U>(sink: &Sink<U>, notification: Notification<T>, on_next: impl FnOnce(T)) {
    match notification {
        Notification::Next(value) => on_next(value),
        Notification::Error(error) => sink.error(error),
        Notification::Complete => sink.complete(),
    }
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Transform every value.
    pub fn map<U, F>(&self, f: F) -> Observable<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let source = self.clone();
        let f = Arc::new(f);
        Observable::new(move |sink: Sink<U>| {
            let f = Arc::clone(&f);
            source.subscribe_with(move |n| forward(&sink, n, |v| sink.next(f(v))))
        })
    }

    /// Keep only values matching the predicate.
    pub fn filter<F>(&self, predicate: F) -> Observable<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let source = self.clone();
        let predicate = Arc::new(predicate);
        Observable::new(move |sink: Sink<T>| {
            let predicate = Arc::clone(&predicate);
            source.subscribe_with(move |n| {
                forward(&sink, n, |v| {
                    if predicate(&v) {
                        sink.next(v);
                    }
                })
            })
        })
    }

    /// Run a side effect for every value, passing values through.
    pub fn tap<F>(&self, f: F) -> Observable<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.try_tap(move |value| {
            f(value);
            Ok(())
        })
    }

    /// Run a fallible check for every value.
    ///
    /// A failing check turns into a stream error and the value is dropped.
    pub fn try_tap<F>(&self, check: F) -> Observable<T>
    where
        F: Fn(&T) -> Result<()> + Send + Sync + 'static,
    {
        let source = self.clone();
        let check = Arc::new(check);
        Observable::new(move |sink: Sink<T>| {
            let check = Arc::clone(&check);
            source.subscribe_with(move |n| {
                forward(&sink, n, |v| match check(&v) {
                    Ok(()) => sink.next(v),
                    Err(error) => sink.error(error),
                })
            })
        })
    }

    /// Emit `value` first, then everything from this stream.
    pub fn start_with(&self, value: T) -> Observable<T> {
        let source = self.clone();
        Observable::new(move |sink: Sink<T>| {
            sink.next(value.clone());
            if sink.is_closed() {
                return Subscription::closed();
            }
            let downstream = sink.clone();
            source.subscribe_with(move |n| downstream.notify(n))
        })
    }

    /// Emit each value paired with the one before it.
    ///
    /// The first value only primes the pair; nothing is emitted for it.
    pub fn pairwise(&self) -> Observable<(T, T)> {
        let source = self.clone();
        Observable::new(move |sink: Sink<(T, T)>| {
            let previous: Mutex<Option<T>> = Mutex::new(None);
            source.subscribe_with(move |n| {
                forward(&sink, n, |v| {
                    let before = previous.lock().replace(v.clone());
                    if let Some(before) = before {
                        sink.next((before, v));
                    }
                })
            })
        })
    }

    /// Map every value to a stream and merge all of them.
    ///
    /// The result completes once this stream and every inner stream have
    /// completed. Inner streams are released as soon as they complete.
    pub fn flat_map<U, F>(&self, f: F) -> Observable<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> Observable<U> + Send + Sync + 'static,
    {
        let source = self.clone();
        let f = Arc::new(f);
        Observable::new(move |sink: Sink<U>| {
            let group = Subscription::new();
            let active = Arc::new(AtomicUsize::new(1));
            let next_key = Arc::new(AtomicU64::new(0));
            let f = Arc::clone(&f);

            let inner_group = group.downgrade();
            let outer_sink = sink.clone();
            let outer_active = Arc::clone(&active);
            let children: Arc<Mutex<IndexMap<u64, Subscription>>> =
                Arc::new(Mutex::new(IndexMap::new()));
            let children_outer = Arc::clone(&children);

            let outer = source.subscribe_with(move |n| match n {
                Notification::Next(value) => {
                    outer_active.fetch_add(1, Ordering::SeqCst);
                    let key = next_key.fetch_add(1, Ordering::SeqCst);
                    let inner_sink = outer_sink.clone();
                    let inner_active = Arc::clone(&outer_active);
                    let inner_children = Arc::clone(&children_outer);
                    let inner = f(value).subscribe_with(move |n| match n {
                        Notification::Next(v) => inner_sink.next(v),
                        Notification::Error(error) => inner_sink.error(error),
                        Notification::Complete => {
                            inner_children.lock().shift_remove(&key);
                            if inner_active.fetch_sub(1, Ordering::SeqCst) == 1 {
                                inner_sink.complete();
                            }
                        }
                    });
                    if !inner.is_closed() {
                        children_outer.lock().insert(key, inner);
                    }
                }
                Notification::Error(error) => {
                    outer_sink.error(error);
                    inner_group.unsubscribe();
                }
                Notification::Complete => {
                    if outer_active.fetch_sub(1, Ordering::SeqCst) == 1 {
                        outer_sink.complete();
                    }
                }
            });

            group.add_subscription(outer);
            group.add(move || {
                let children = std::mem::take(&mut *children.lock());
                for (_, child) in children {
                    child.unsubscribe();
                }
            });
            group
        })
    }

    /// Map every value to a stream and forward only the most recent one.
    ///
    /// A new value unsubscribes the previous inner stream before the next
    /// one is subscribed. Inner completion never completes the result; only
    /// completion of this stream with no live inner stream does.
    pub fn switch_map<U, F>(&self, f: F) -> Observable<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> Observable<U> + Send + Sync + 'static,
    {
        let source = self.clone();
        let f = Arc::new(f);
        Observable::new(move |sink: Sink<U>| {
            let f = Arc::clone(&f);
            let current: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
            let generation = Arc::new(AtomicU64::new(0));
            let inner_live = Arc::new(Mutex::new(false));
            let outer_done = Arc::new(Mutex::new(false));

            let outer_sink = sink.clone();
            let outer_current = Arc::clone(&current);
            let outer_live = Arc::clone(&inner_live);
            let outer_finished = Arc::clone(&outer_done);
            let outer = source.subscribe_with(move |n| match n {
                Notification::Next(value) => {
                    let mine = generation.fetch_add(1, Ordering::SeqCst) + 1;
                    let previous = outer_current.lock().take();
                    if let Some(previous) = previous {
                        previous.unsubscribe();
                    }
                    *outer_live.lock() = true;

                    let inner_sink = outer_sink.clone();
                    let inner_generation = Arc::clone(&generation);
                    let inner_live = Arc::clone(&outer_live);
                    let inner_outer_done = Arc::clone(&outer_finished);
                    let inner = f(value).subscribe_with(move |n| {
                        if inner_generation.load(Ordering::SeqCst) != mine {
                            return;
                        }
                        match n {
                            Notification::Next(v) => inner_sink.next(v),
                            Notification::Error(error) => inner_sink.error(error),
                            Notification::Complete => {
                                *inner_live.lock() = false;
                                if *inner_outer_done.lock() {
                                    inner_sink.complete();
                                }
                            }
                        }
                    });

                    if generation.load(Ordering::SeqCst) == mine {
                        *outer_current.lock() = Some(inner);
                    } else {
                        inner.unsubscribe();
                    }
                }
                Notification::Error(error) => outer_sink.error(error),
                Notification::Complete => {
                    *outer_finished.lock() = true;
                    if !*outer_live.lock() {
                        outer_sink.complete();
                    }
                }
            });

            let subscription = Subscription::new();
            subscription.add_subscription(outer);
            subscription.add(move || {
                let inner = current.lock().take();
                if let Some(inner) = inner {
                    inner.unsubscribe();
                }
            });
            subscription
        })
    }

    /// Merge several streams into one.
    ///
    /// Completes once every source has completed.
    pub fn merge(sources: Vec<Observable<T>>) -> Observable<T> {
        Observable::from_iter(sources).merge_all()
    }

    /// Emit the latest value of every source, as a vector in source order,
    /// each time any source emits once all of them have emitted.
    ///
    /// This is the join the sequencer waits on. It completes once every
    /// source has completed; an empty source list completes immediately.
    pub fn combine_latest(sources: Vec<Observable<T>>) -> Observable<Vec<T>> {
        Observable::new(move |sink: Sink<Vec<T>>| {
            if sources.is_empty() {
                sink.complete();
                return Subscription::closed();
            }

            let slots: Arc<Mutex<Vec<Option<T>>>> =
                Arc::new(Mutex::new(vec![None; sources.len()]));
            let remaining = Arc::new(AtomicUsize::new(sources.len()));
            let subscription = Subscription::new();

            for (index, source) in sources.iter().enumerate() {
                let sink = sink.clone();
                let slots = Arc::clone(&slots);
                let remaining = Arc::clone(&remaining);
                let inner = source.subscribe_with(move |n| match n {
                    Notification::Next(value) => {
                        let ready = {
                            let mut slots = slots.lock();
                            slots[index] = Some(value);
                            if slots.iter().all(Option::is_some) {
                                Some(slots.iter().flatten().cloned().collect::<Vec<T>>())
                            } else {
                                None
                            }
                        };
                        if let Some(values) = ready {
                            sink.next(values);
                        }
                    }
                    Notification::Error(error) => sink.error(error),
                    Notification::Complete => {
                        if remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                            sink.complete();
                        }
                    }
                });
                subscription.add_subscription(inner);
            }
            subscription
        })
    }

    /// Multicast through a replay-one subject once connected.
    pub fn replay(&self) -> Replayed<T> {
        Replayed::new(self.clone())
    }

    /// Multicast with replay, connecting on the first subscription and
    /// disconnecting once the last subscriber leaves.
    pub fn share_replay(&self) -> Observable<T> {
        let replayed = self.replay();
        let subscribers = Arc::new(AtomicUsize::new(0));
        Observable::new(move |sink: Sink<T>| {
            let subscription = replayed.observable().subscribe_sink(sink);
            subscribers.fetch_add(1, Ordering::SeqCst);
            let connection = replayed.connect();
            let remaining = Arc::clone(&subscribers);
            subscription.add(move || {
                if remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                    connection.unsubscribe();
                }
            });
            subscription
        })
    }
}

impl<T> Observable<Observable<T>>
where
    T: Clone + Send + Sync + 'static,
{
    /// Flatten a stream of streams by merging every inner stream.
    pub fn merge_all(&self) -> Observable<T> {
        self.flat_map(|inner| inner)
    }
}

struct ReplayedInner<T> {
    source: Observable<T>,
    subject: ReplaySubject<T>,
    connection: Mutex<Option<Subscription>>,
}

/// A connectable stream multicast through a [`ReplaySubject`].
///
/// Subscribers attach to the subject and never trigger the upstream. The
/// upstream runs once, when [`Replayed::connect`] is first called.
pub struct Replayed<T> {
    inner: Arc<ReplayedInner<T>>,
}

impl<T> Clone for Replayed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Replayed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replayed")
            .field("connected", &self.inner.connection.lock().is_some())
            .finish()
    }
}

impl<T> Replayed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(source: Observable<T>) -> Self {
        Self {
            inner: Arc::new(ReplayedInner {
                source,
                subject: ReplaySubject::new(),
                connection: Mutex::new(None),
            }),
        }
    }

    /// Start the upstream. Repeated calls return the live connection.
    pub fn connect(&self) -> Subscription {
        let connection = {
            let mut slot = self.inner.connection.lock();
            if let Some(existing) = slot.as_ref() {
                if !existing.is_closed() {
                    return existing.clone();
                }
            }
            let connection = Subscription::new();
            *slot = Some(connection.clone());
            connection
        };

        let subject = self.inner.subject.clone();
        let upstream = self
            .inner
            .source
            .subscribe_with(move |n| subject.notify(n));
        connection.add_subscription(upstream);
        connection
    }

    /// The multicast stream.
    pub fn observable(&self) -> Observable<T> {
        self.inner.subject.observable()
    }

    /// The most recent value, if any.
    pub fn latest(&self) -> Option<T> {
        self.inner.subject.value()
    }
}
