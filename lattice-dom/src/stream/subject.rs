//! Subject Implementation
//!
//! A Subject is both the producing and the observable end of a stream. It
//! keeps a list of subscribed sinks and forwards every notification to them.
//!
//! # How Subjects Work
//!
//! 1. Subscribing registers the sink with the subject under its ID.
//!
//! 2. Pushing a value snapshots the registered sinks, releases the lock and
//!    then notifies each of them, so callbacks may subscribe or unsubscribe.
//!
//! 3. A terminal notification is remembered and replayed to late subscribers.
//!
//! # Flavours
//!
//! - [`Subject`] forwards values to current subscribers only.
//! - [`ReplaySubject`] remembers its latest value and hands it to every new
//!   subscriber synchronously (a replay buffer of one).
//! - [`AsyncSubject`] holds on to its last value and delivers it only when it
//!   completes. It is the single-slot relay the driver feeds its tree stream
//!   through.

use std::sync::Arc;

use parking_lot::Mutex;

use super::observable::{Notification, Observable, Sink};
use super::subscription::Subscription;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Publish,
    Replay,
    Last,
}

#[derive(Clone)]
enum Terminal {
    Completed,
    Failed(Error),
}

struct State<T> {
    observers: Vec<Sink<T>>,
    latest: Option<T>,
    terminal: Option<Terminal>,
    disposed: bool,
}

struct Core<T> {
    mode: Mode,
    state: Mutex<State<T>>,
}

impl<T> Core<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            state: Mutex::new(State {
                observers: Vec::new(),
                latest: None,
                terminal: None,
                disposed: false,
            }),
        })
    }

    fn next(&self, value: T) {
        let observers = {
            let mut state = self.state.lock();
            if state.terminal.is_some() || state.disposed {
                return;
            }
            match self.mode {
                Mode::Publish => {}
                Mode::Replay => state.latest = Some(value.clone()),
                Mode::Last => {
                    state.latest = Some(value);
                    return;
                }
            }
            state.observers.clone()
        };

        for sink in observers {
            sink.next(value.clone());
        }
    }

    fn error(&self, error: Error) {
        let observers = {
            let mut state = self.state.lock();
            if state.terminal.is_some() || state.disposed {
                return;
            }
            state.terminal = Some(Terminal::Failed(error.clone()));
            if self.mode == Mode::Last {
                state.latest = None;
            }
            std::mem::take(&mut state.observers)
        };

        for sink in observers {
            sink.error(error.clone());
        }
    }

    fn complete(&self) {
        let (observers, last) = {
            let mut state = self.state.lock();
            if state.terminal.is_some() || state.disposed {
                return;
            }
            state.terminal = Some(Terminal::Completed);
            let last = match self.mode {
                Mode::Last => state.latest.clone(),
                _ => None,
            };
            (std::mem::take(&mut state.observers), last)
        };

        for sink in observers {
            if let Some(value) = &last {
                sink.next(value.clone());
            }
            sink.complete();
        }
    }

    fn subscribe(self: &Arc<Self>, sink: Sink<T>) -> Subscription {
        let (replay, terminal) = {
            let mut state = self.state.lock();
            if state.disposed {
                tracing::debug!("subscription to a disposed subject ignored");
                return Subscription::closed();
            }
            let replay = match (self.mode, &state.terminal) {
                (Mode::Replay, _) => state.latest.clone(),
                (Mode::Last, Some(Terminal::Completed)) => state.latest.clone(),
                _ => None,
            };
            let terminal = state.terminal.clone();
            if terminal.is_none() {
                state.observers.push(sink.clone());
            }
            (replay, terminal)
        };

        if let Some(value) = replay {
            sink.next(value);
        }
        match terminal {
            Some(Terminal::Completed) => sink.complete(),
            Some(Terminal::Failed(error)) => sink.error(error),
            None => {}
        }

        let core = Arc::downgrade(self);
        let id = sink.id();
        let subscription = Subscription::new();
        subscription.add(move || {
            if let Some(core) = core.upgrade() {
                core.state.lock().observers.retain(|s| s.id() != id);
            }
        });
        subscription
    }

    fn dispose(&self) {
        let mut state = self.state.lock();
        state.disposed = true;
        state.observers.clear();
        state.latest = None;
    }
}

macro_rules! subject_api {
    ($name:ident, $mode:expr) => {
        impl<T> $name<T>
        where
            T: Clone + Send + Sync + 'static,
        {
            /// Create a new subject with no subscribers.
            pub fn new() -> Self {
                Self {
                    core: Core::new($mode),
                }
            }

            /// Push a value to subscribers.
            pub fn next(&self, value: T) {
                self.core.next(value);
            }

            /// Fail the subject and every current and future subscriber.
            pub fn error(&self, error: Error) {
                self.core.error(error);
            }

            /// Complete the subject and every current and future subscriber.
            pub fn complete(&self) {
                self.core.complete();
            }

            /// Forward a notification of any kind.
            pub fn notify(&self, notification: Notification<T>) {
                match notification {
                    Notification::Next(value) => self.next(value),
                    Notification::Error(error) => self.error(error),
                    Notification::Complete => self.complete(),
                }
            }

            /// Release all subscribers and stop accepting notifications.
            pub fn dispose(&self) {
                self.core.dispose();
            }

            /// Whether the subject has been disposed.
            pub fn is_disposed(&self) -> bool {
                self.core.state.lock().disposed
            }

            /// Number of currently subscribed sinks.
            pub fn observer_count(&self) -> usize {
                self.core.state.lock().observers.len()
            }

            /// View the subject as an observable.
            pub fn observable(&self) -> Observable<T> {
                let core = Arc::clone(&self.core);
                Observable::new(move |sink| core.subscribe(sink))
            }
        }

        impl<T> Default for $name<T>
        where
            T: Clone + Send + Sync + 'static,
        {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                Self {
                    core: Arc::clone(&self.core),
                }
            }
        }

        impl<T> std::fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let state = self.core.state.lock();
                f.debug_struct(stringify!($name))
                    .field("observers", &state.observers.len())
                    .field("terminated", &state.terminal.is_some())
                    .field("disposed", &state.disposed)
                    .finish()
            }
        }
    };
}

/// Multicasts notifications to current subscribers.
pub struct Subject<T> {
    core: Arc<Core<T>>,
}

/// Multicasts notifications and replays the latest value to new subscribers.
pub struct ReplaySubject<T> {
    core: Arc<Core<T>>,
}

/// Delivers its last value, followed by completion, once it completes.
pub struct AsyncSubject<T> {
    core: Arc<Core<T>>,
}

subject_api!(Subject, Mode::Publish);
subject_api!(ReplaySubject, Mode::Replay);
subject_api!(AsyncSubject, Mode::Last);

impl<T> ReplaySubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The most recent value, if any has been pushed.
    pub fn value(&self) -> Option<T> {
        self.core.state.lock().latest.clone()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record<T: Clone + Send + Sync + 'static>(
        observable: &Observable<T>,
    ) -> (Arc<Mutex<Vec<Notification<T>>>>, Subscription) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();
        let subscription = observable.subscribe_with(move |n| log_clone.lock().push(n));
        (log, subscription)
    }

    #[test]
    fn subject_forwards_to_current_subscribers_only() {
        let subject = Subject::new();
        subject.next(1);

        let (log, _sub) = record(&subject.observable());
        subject.next(2);
        subject.complete();

        assert_eq!(
            *log.lock(),
            vec![Notification::Next(2), Notification::Complete]
        );
    }

    #[test]
    fn subject_unsubscribe_removes_observer() {
        let subject = Subject::new();
        let (log, sub) = record(&subject.observable());
        assert_eq!(subject.observer_count(), 1);

        sub.unsubscribe();
        assert_eq!(subject.observer_count(), 0);

        subject.next(1);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn replay_subject_hands_latest_to_late_subscribers() {
        let subject = ReplaySubject::new();
        subject.next("a");
        subject.next("b");

        let (log, _sub) = record(&subject.observable());
        assert_eq!(*log.lock(), vec![Notification::Next("b")]);
        assert_eq!(subject.value(), Some("b"));

        subject.next("c");
        assert_eq!(
            *log.lock(),
            vec![Notification::Next("b"), Notification::Next("c")]
        );
    }

    #[test]
    fn async_subject_emits_last_value_on_completion() {
        let subject = AsyncSubject::new();
        let (early, _sub) = record(&subject.observable());

        subject.next(1);
        subject.next(2);
        assert!(early.lock().is_empty());

        subject.complete();
        assert_eq!(
            *early.lock(),
            vec![Notification::Next(2), Notification::Complete]
        );

        // Late subscribers get the settled value too.
        let (late, _sub) = record(&subject.observable());
        assert_eq!(
            *late.lock(),
            vec![Notification::Next(2), Notification::Complete]
        );
    }

    #[test]
    fn errors_are_replayed_to_late_subscribers() {
        let subject: ReplaySubject<i32> = ReplaySubject::new();
        subject.error(Error::stream("failed"));

        let (log, _sub) = record(&subject.observable());
        assert_eq!(
            *log.lock(),
            vec![Notification::Error(Error::stream("failed"))]
        );
    }

    #[test]
    fn disposed_subject_ignores_everything() {
        let subject = AsyncSubject::new();
        let (log, _sub) = record(&subject.observable());

        subject.dispose();
        assert!(subject.is_disposed());
        subject.next(1);
        subject.complete();

        assert!(log.lock().is_empty());
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn callbacks_may_subscribe_reentrantly() {
        let subject = Subject::new();
        let inner_log = Arc::new(Mutex::new(Vec::new()));

        let subject_clone = subject.clone();
        let inner_log_clone = inner_log.clone();
        let _outer = subject.observable().subscribe(move |value: i32| {
            if value == 1 {
                let log = inner_log_clone.clone();
                subject_clone.observable().subscribe(move |v| log.lock().push(v));
            }
        });

        subject.next(1);
        subject.next(2);
        assert_eq!(*inner_log.lock(), vec![2]);
    }
}
