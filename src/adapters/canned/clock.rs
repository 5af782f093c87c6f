//! Canned adapter for the Clock port.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::ports::clock::{Clock, SleepFuture};

/// A clock frozen at one instant. Sleeps return immediately and are logged.
pub struct FixedClock {
    now: DateTime<Utc>,
    sleeps: Mutex<Vec<Duration>>,
}

impl FixedClock {
    /// Creates a clock frozen at `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now, sleeps: Mutex::new(Vec::new()) }
    }

    /// Durations passed to `sleep`, in call order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("sleep log lock poisoned").clone()
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        self.sleeps.lock().expect("sleep log lock poisoned").push(duration);
        Box::pin(std::future::ready(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sleeps_are_recorded_not_waited() {
        let now = "2024-06-15T10:30:00Z".parse::<DateTime<Utc>>().unwrap();
        let clock = FixedClock::new(now);
        clock.sleep(Duration::from_secs(20)).await;
        clock.sleep(Duration::from_secs(20)).await;

        assert_eq!(clock.now(), now);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(20); 2]);
    }
}
