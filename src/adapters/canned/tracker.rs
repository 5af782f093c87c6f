//! Canned adapter for the `TrackerClient` port.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::PortError;
use crate::issue::{IssueRecord, TrackerKind};
use crate::ports::tracker::{FetchFuture, TrackerClient};

/// Serves issue records from a map and logs every batch it is asked for.
pub struct CannedTracker {
    kind: TrackerKind,
    records: HashMap<String, IssueRecord>,
    credentials: bool,
    failures_left: Mutex<u32>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl CannedTracker {
    /// Creates an empty tracker of the given kind, with credentials.
    #[must_use]
    pub fn new(kind: TrackerKind) -> Self {
        Self {
            kind,
            records: HashMap::new(),
            credentials: true,
            failures_left: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Adds a record, keyed by its id.
    #[must_use]
    pub fn with_record(mut self, record: IssueRecord) -> Self {
        self.records.insert(record.id.clone(), record);
        self
    }

    /// Behaves as if no API key were configured.
    #[must_use]
    pub fn without_credentials(mut self) -> Self {
        self.credentials = false;
        self
    }

    /// Makes the next `count` fetches fail.
    #[must_use]
    pub fn failing(self, count: u32) -> Self {
        *self.failures_left.lock().expect("failure counter lock poisoned") = count;
        self
    }

    /// The id batches fetched so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("call log lock poisoned").clone()
    }
}

impl TrackerClient for CannedTracker {
    fn kind(&self) -> TrackerKind {
        self.kind
    }

    fn has_credentials(&self) -> bool {
        self.credentials
    }

    fn fetch(&self, ids: &[String]) -> FetchFuture<'_> {
        self.calls.lock().expect("call log lock poisoned").push(ids.to_vec());

        let result: Result<Vec<IssueRecord>, PortError> = {
            let mut failures = self.failures_left.lock().expect("failure counter lock poisoned");
            if *failures > 0 {
                *failures -= 1;
                Err(format!("{} tracker unavailable", self.kind).into())
            } else {
                Ok(ids.iter().filter_map(|id| self.records.get(id).cloned()).collect())
            }
        };
        Box::pin(std::future::ready(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> IssueRecord {
        IssueRecord { id: id.into(), status: "NEW".into(), ..IssueRecord::default() }
    }

    #[tokio::test]
    async fn serves_known_ids_and_logs_calls() {
        let tracker = CannedTracker::new(TrackerKind::Bugzilla).with_record(record("1"));
        let got = tracker.fetch(&["1".to_string(), "2".to_string()]).await.unwrap();

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, "1");
        assert_eq!(tracker.calls(), vec![vec!["1".to_string(), "2".to_string()]]);
    }

    #[tokio::test]
    async fn scripted_failures_come_first() {
        let tracker = CannedTracker::new(TrackerKind::Jira).with_record(record("SAT-1")).failing(1);
        assert!(tracker.fetch(&["SAT-1".to_string()]).await.is_err());
        assert!(tracker.fetch(&["SAT-1".to_string()]).await.is_ok());
    }
}
