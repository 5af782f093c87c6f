//! Bounded, fixed-delay retry around tracker batch calls.

use std::time::Duration;

use tracing::warn;

use crate::error::PortError;
use crate::issue::IssueRecord;
use crate::ports::clock::Clock;
use crate::ports::tracker::TrackerClient;

/// How often and how patiently a failing tracker call is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Wait between consecutive attempts.
    pub fixed_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 4, fixed_delay: Duration::from_secs(20) }
    }
}

impl RetryPolicy {
    /// A policy that tries once and never waits.
    #[must_use]
    pub fn no_retry() -> Self {
        Self { max_attempts: 1, fixed_delay: Duration::ZERO }
    }
}

/// Fetches `ids` from `tracker`, retrying failed calls under `policy`.
///
/// # Errors
///
/// Returns the last tracker error once every attempt has failed.
pub async fn fetch_with_retry(
    tracker: &dyn TrackerClient,
    clock: &dyn Clock,
    policy: RetryPolicy,
    ids: &[String],
) -> Result<Vec<IssueRecord>, PortError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match tracker.fetch(ids).await {
            Ok(records) => return Ok(records),
            Err(e) if attempt < max_attempts => {
                warn!(
                    tracker = %tracker.kind(),
                    attempt,
                    max_attempts,
                    error = %e,
                    "Tracker call failed, retrying in {:?}",
                    policy.fixed_delay
                );
                clock.sleep(policy.fixed_delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::canned::{CannedTracker, FixedClock};
    use crate::issue::TrackerKind;
    use chrono::Utc;

    fn ids() -> Vec<String> {
        vec!["SAT-1".to_string()]
    }

    fn tracker() -> CannedTracker {
        CannedTracker::new(TrackerKind::Jira).with_record(IssueRecord {
            id: "SAT-1".into(),
            status: "Closed".into(),
            ..IssueRecord::default()
        })
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let tracker = tracker().failing(3);
        let clock = FixedClock::new(Utc::now());
        let records =
            fetch_with_retry(&tracker, &clock, RetryPolicy::default(), &ids()).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(tracker.calls().len(), 4);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(20); 3]);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let tracker = tracker().failing(10);
        let clock = FixedClock::new(Utc::now());
        let policy = RetryPolicy { max_attempts: 3, fixed_delay: Duration::from_secs(5) };

        assert!(fetch_with_retry(&tracker, &clock, policy, &ids()).await.is_err());
        assert_eq!(tracker.calls().len(), 3);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5); 2]);
    }

    #[tokio::test]
    async fn zero_attempts_still_calls_once() {
        let tracker = tracker();
        let clock = FixedClock::new(Utc::now());
        let policy = RetryPolicy { max_attempts: 0, fixed_delay: Duration::ZERO };

        assert!(fetch_with_retry(&tracker, &clock, policy, &ids()).await.is_ok());
        assert_eq!(tracker.calls().len(), 1);
        assert!(clock.sleeps().is_empty());
    }
}
