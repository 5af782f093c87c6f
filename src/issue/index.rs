//! The collected-issue index: which tests use which issue, and what the
//! tracker says about it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::record::IssueRecord;
use super::reference::IssueRef;

/// One place an issue is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// File the usage lives in.
    pub filepath: String,
    /// Line number of the test (or `1` for module-level usage).
    pub lineno: u32,
    /// Test case name, or module name for module-level usage.
    pub testcase: String,
    /// Component under test.
    #[serde(default)]
    pub component: Option<String>,
    /// Test importance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,
    /// Slugified component, used for filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_mark: Option<String>,
    /// `skip_if_open`, `skip`, `deselect`, `is_open`, or `not is_open`.
    pub usage: String,
}

/// Index entry for one issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueEntry {
    /// Tracker data; `None` until the resolver fills it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<IssueRecord>,
    /// Where the issue is used.
    #[serde(default)]
    pub used_in: Vec<UsageRecord>,
    /// The issue was pulled in only as the canonical target of a duplicate.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_dupe: bool,
}

/// Mapping from issue reference to its entry, in key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueIndex {
    entries: BTreeMap<IssueRef, IssueEntry>,
}

impl IssueIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `issue`, creating an empty one if needed.
    pub fn entry_mut(&mut self, issue: &IssueRef) -> &mut IssueEntry {
        self.entries.entry(issue.clone()).or_default()
    }

    /// Returns the entry for `issue`, if present.
    #[must_use]
    pub fn get(&self, issue: &IssueRef) -> Option<&IssueEntry> {
        self.entries.get(issue)
    }

    /// Returns the resolved record for `issue`, if present.
    #[must_use]
    pub fn record(&self, issue: &IssueRef) -> Option<&IssueRecord> {
        self.entries.get(issue).and_then(|e| e.data.as_ref())
    }

    /// True when `issue` has an entry.
    #[must_use]
    pub fn contains(&self, issue: &IssueRef) -> bool {
        self.entries.contains_key(issue)
    }

    /// Records a usage of `issue`.
    pub fn add_usage(&mut self, issue: &IssueRef, usage: UsageRecord) {
        self.entry_mut(issue).used_in.push(usage);
    }

    /// Drops the version-dependent `is_open` and `is_deselected` verdicts
    /// so they are derived again. Fallback records keep theirs.
    pub fn forget_derived_status(&mut self) {
        for record in self.entries.values_mut().filter_map(|entry| entry.data.as_mut()) {
            if !record.is_fallback() {
                record.is_open = None;
                record.is_deselected = None;
            }
        }
    }

    /// Iterates over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&IssueRef, &IssueEntry)> {
        self.entries.iter()
    }

    /// Number of indexed issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no issue is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(IssueRef, IssueEntry)> for IssueIndex {
    fn from_iter<T: IntoIterator<Item = (IssueRef, IssueEntry)>>(iter: T) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}
