//! Service context bundling all port trait objects.

use crate::adapters::live::{LiveBugzilla, LiveClock, LiveFileSystem, LiveJira};
use crate::config::Settings;
use crate::issue::TrackerKind;
use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;
use crate::ports::tracker::TrackerClient;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations (live or canned).
pub struct ServiceContext {
    /// Clock for timestamps and retry waits.
    pub clock: Box<dyn Clock>,
    /// Filesystem for manifests and cache files.
    pub fs: Box<dyn FileSystem>,
    /// Bugzilla client.
    pub bugzilla: Box<dyn TrackerClient>,
    /// Jira client.
    pub jira: Box<dyn TrackerClient>,
}

impl ServiceContext {
    /// Creates a live context talking to the configured trackers.
    #[must_use]
    pub fn live(settings: &Settings) -> Self {
        Self {
            clock: Box::new(LiveClock),
            fs: Box::new(LiveFileSystem),
            bugzilla: Box::new(LiveBugzilla::new(&settings.bugzilla)),
            jira: Box::new(LiveJira::new(&settings.jira)),
        }
    }

    /// Creates a context from explicit adapters.
    #[must_use]
    pub fn new(
        clock: Box<dyn Clock>,
        fs: Box<dyn FileSystem>,
        bugzilla: Box<dyn TrackerClient>,
        jira: Box<dyn TrackerClient>,
    ) -> Self {
        Self { clock, fs, bugzilla, jira }
    }

    /// The client for `kind`.
    #[must_use]
    pub fn tracker(&self, kind: TrackerKind) -> &dyn TrackerClient {
        match kind {
            TrackerKind::Bugzilla => self.bugzilla.as_ref(),
            TrackerKind::Jira => self.jira.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::canned::{CannedTracker, FixedClock, MemoryFileSystem};
    use chrono::Utc;

    #[test]
    fn tracker_dispatches_by_kind() {
        let ctx = ServiceContext::new(
            Box::new(FixedClock::new(Utc::now())),
            Box::new(MemoryFileSystem::new()),
            Box::new(CannedTracker::new(TrackerKind::Bugzilla)),
            Box::new(CannedTracker::new(TrackerKind::Jira)),
        );
        assert_eq!(ctx.tracker(TrackerKind::Bugzilla).kind(), TrackerKind::Bugzilla);
        assert_eq!(ctx.tracker(TrackerKind::Jira).kind(), TrackerKind::Jira);
    }

    #[test]
    fn live_context_reports_missing_credentials() {
        let ctx = ServiceContext::live(&Settings::default());
        assert!(!ctx.bugzilla.has_credentials());
        assert!(!ctx.jira.has_credentials());
    }
}
