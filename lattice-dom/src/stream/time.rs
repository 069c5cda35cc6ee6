//! Time-based streams driven by the tokio runtime.

use std::time::Duration;

use super::observable::{Observable, Sink};
use super::subscription::Subscription;
use crate::error::Error;

impl Observable<()> {
    /// Emit once after `delay`, then complete.
    ///
    /// Must be subscribed from within a tokio runtime; otherwise the stream
    /// fails with [`Error::NoRuntime`]. Unsubscribing aborts the timer.
    pub fn timer(delay: Duration) -> Observable<()> {
        Observable::new(move |sink: Sink<()>| {
            let handle = match tokio::runtime::Handle::try_current() {
                Ok(handle) => handle,
                Err(_) => {
                    sink.error(Error::NoRuntime);
                    return Subscription::closed();
                }
            };

            let task = handle.spawn(async move {
                tokio::time::sleep(delay).await;
                sink.next(());
                sink.complete();
            });

            let subscription = Subscription::new();
            subscription.add(move || task.abort());
            subscription
        })
    }
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Shift every value by `delay`.
    pub fn delay(&self, delay: Duration) -> Observable<T> {
        self.flat_map(move |value| Observable::<()>::timer(delay).map(move |_| value.clone()))
    }
}
