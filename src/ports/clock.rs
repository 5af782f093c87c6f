//! Clock port for obtaining the current time and waiting between retries.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Boxed future returned by [`Clock::sleep`], keeping the trait dyn-compatible.
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Provides the current time and a way to wait.
///
/// Abstracting time lets retry back-off run instantly under test while
/// still recording how long the caller asked to wait.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Waits for `duration` before resolving.
    fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        (**self).sleep(duration)
    }
}
