//! Reactive Streams
//!
//! This module implements the push-based streams the render pipeline is
//! built from: observables, the sinks they push into, subscriptions that
//! tear them down, and subjects that multicast.
//!
//! # Concepts
//!
//! ## Observables
//!
//! An Observable is a lazy description of a stream. Nothing happens until it
//! is subscribed; every subscription runs the producer again. Values are
//! pushed synchronously into a [`Sink`], followed by at most one terminal
//! notification (error or completion).
//!
//! ## Subscriptions
//!
//! A Subscription owns the teardown logic of a running stream. Unsubscribing
//! closes the sink first, then runs teardowns in registration order, so no
//! value is delivered once teardown has begun.
//!
//! ## Subjects
//!
//! Subjects are both a sink and an observable. [`Subject`] only forwards,
//! [`ReplaySubject`] also replays its latest value to late subscribers, and
//! [`AsyncSubject`] delivers only its last value, once it completes.
//!
//! # Implementation Notes
//!
//! All stream types are `Send + Sync` so that timers can fire from a tokio
//! task, but emission is always synchronous on whichever thread produced
//! the value. Locks are never held while a sink is notified, which keeps
//! re-entrant subscription (subscribing from inside a callback) safe.

mod observable;
mod operators;
mod subject;
mod subscription;
mod time;

pub use observable::{Notification, Observable, Observer, Sink};
pub use operators::Replayed;
pub use subject::{AsyncSubject, ReplaySubject, Subject};
pub use subscription::{SubscriberId, Subscription, WeakSubscription};
