//! Issue references such as `BZ:1625783` and `JR:SAT-12345`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// The external tracker an issue lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackerKind {
    /// Bugzilla, tagged `BZ`.
    Bugzilla,
    /// Jira, tagged `JR`.
    Jira,
}

impl TrackerKind {
    /// All supported trackers, in resolution order.
    pub const ALL: [Self; 2] = [Self::Bugzilla, Self::Jira];

    /// The two-letter tag used in references and markers.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Bugzilla => "BZ",
            Self::Jira => "JR",
        }
    }

    /// Looks up a tracker by its tag, case-insensitively.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "BZ" => Some(Self::Bugzilla),
            "JR" => Some(Self::Jira),
            _ => None,
        }
    }
}

impl fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// An issue reference: which tracker, which issue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IssueRef {
    /// Tracker holding the issue.
    pub kind: TrackerKind,
    /// Tracker-specific id (`1625783`, `SAT-12345`).
    pub id: String,
}

impl IssueRef {
    /// Builds a reference from its parts.
    pub fn new(kind: TrackerKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }
}

impl FromStr for IssueRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, id) = s.split_once(':').ok_or_else(|| Error::InvalidIssueRef(s.to_string()))?;
        let kind = TrackerKind::from_tag(tag).ok_or_else(|| Error::InvalidIssueRef(s.to_string()))?;
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::InvalidIssueRef(s.to_string()));
        }
        Ok(Self::new(kind, id))
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl Serialize for IssueRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IssueRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
