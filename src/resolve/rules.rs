//! Status rules: when an issue counts as open, and when its tests are dropped.
//!
//! The rules run on the record reached after following duplicates.

use crate::issue::{IssueRecord, TrackerKind};
use crate::version::Version;

/// Resolution that deselects tests instead of skipping them.
pub const OBSOLETE_RESOLUTION: &str = "Obsolete";

/// Status and resolution vocabulary of one tracker.
#[derive(Debug)]
pub struct Vocabulary {
    /// Statuses meaning work has not finished.
    pub open: &'static [&'static str],
    /// Statuses meaning work has finished, one way or another.
    pub closed: &'static [&'static str],
    /// Closed resolutions meaning the issue was never fixed.
    pub wontfix: &'static [&'static str],
    /// Resolution marking a duplicate.
    pub duplicate: &'static str,
}

const BUGZILLA: Vocabulary = Vocabulary {
    open: &["NEW", "ASSIGNED", "POST", "MODIFIED"],
    closed: &["ON_QA", "VERIFIED", "RELEASE_PENDING", "CLOSED"],
    wontfix: &["WONTFIX", "CANTFIX", "DEFERRED"],
    duplicate: "DUPLICATE",
};

const JIRA: Vocabulary = Vocabulary {
    open: &["New", "Backlog", "Refinement", "To Do", "In Progress", "Review"],
    closed: &["Release Pending", "Closed"],
    wontfix: &[OBSOLETE_RESOLUTION],
    duplicate: "Duplicate",
};

impl Vocabulary {
    /// The vocabulary of `kind`.
    #[must_use]
    pub fn of(kind: TrackerKind) -> &'static Self {
        match kind {
            TrackerKind::Bugzilla => &BUGZILLA,
            TrackerKind::Jira => &JIRA,
        }
    }

    fn is_open_status(&self, record: &IssueRecord) -> bool {
        self.open.contains(&record.status.as_str())
    }

    fn is_closed_status(&self, record: &IssueRecord) -> bool {
        self.closed.contains(&record.status.as_str())
    }

    fn is_wontfix(&self, record: &IssueRecord) -> bool {
        self.is_closed_status(record) && self.wontfix.contains(&record.resolution.as_str())
    }
}

/// True when `record` is a duplicate pointing at another issue.
#[must_use]
pub fn is_duplicate(kind: TrackerKind, record: &IssueRecord) -> bool {
    record.dupe_of.is_some()
        && record.resolution.eq_ignore_ascii_case(Vocabulary::of(kind).duplicate)
}

/// Whether the issue still affects a server at `server_version`.
#[must_use]
pub fn is_open(kind: TrackerKind, record: &IssueRecord, server_version: &Version) -> bool {
    let vocabulary = Vocabulary::of(kind);
    if vocabulary.is_open_status(record) || vocabulary.is_wontfix(record) {
        return true;
    }
    match kind {
        TrackerKind::Bugzilla => !fixed_in_clone_chain(record, server_version),
        TrackerKind::Jira => *server_version < jira_fix_version(record),
    }
}

/// Whether tests using the issue should be dropped from the run.
#[must_use]
pub fn should_deselect(kind: TrackerKind, record: &IssueRecord) -> bool {
    Vocabulary::of(kind).is_closed_status(record) && record.resolution == OBSOLETE_RESOLUTION
}

/// Lowest Jira fix version, or `0` when none is set.
fn jira_fix_version(record: &IssueRecord) -> Version {
    record
        .fix_versions
        .iter()
        .filter_map(|v| Version::extract(v))
        .min()
        .unwrap_or_else(Version::zero)
}

/// Bugzilla fix version: the target milestone when it is a version,
/// otherwise the lowest acked (`+`) `sat-X.Y` flag.
fn bugzilla_fix_version(record: &IssueRecord) -> Option<Version> {
    if let Some(milestone) = record.target_milestone.as_deref().and_then(Version::parse) {
        return Some(milestone);
    }
    record
        .flags
        .iter()
        .filter(|f| f.status == "+" && f.name.starts_with("sat-"))
        .filter_map(|f| Version::extract(&f.name))
        .min()
}

/// The issue or one of its fixed clones landed at or below `server_version`.
///
/// A closed issue without any fix version counts as fixed everywhere.
/// Clones only count when they are closed, not wontfix, and name a version.
fn fixed_in_clone_chain(record: &IssueRecord, server_version: &Version) -> bool {
    if bugzilla_fix_version(record).unwrap_or_else(Version::zero) <= *server_version {
        return true;
    }
    record.clones.iter().any(|clone| {
        BUGZILLA.is_closed_status(clone)
            && !BUGZILLA.is_wontfix(clone)
            && bugzilla_fix_version(clone).is_some_and(|v| v <= *server_version)
    })
}
