//! Tracker data for a single issue.

use serde::{Deserialize, Deserializer, Serialize};

/// A Bugzilla flag such as `sat-6.10.0+`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    /// Flag name, e.g. `sat-6.10.0`.
    pub name: String,
    /// Flag status: `+`, `-`, or `?`.
    #[serde(default)]
    pub status: String,
}

/// Issue data as fetched from a tracker, plus derived status.
///
/// Fields the gate does not interpret are kept in `extra` so cache files
/// preserve everything the tracker returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Tracker id (`1625783`, `SAT-12345`).
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    /// Free-text status (`CLOSED`, `In Progress`, ...).
    #[serde(default)]
    pub status: String,
    /// Free-text resolution (`ERRATA`, `Done`, `Obsolete`, ...).
    #[serde(default, deserialize_with = "string_or_null")]
    pub resolution: String,
    /// Jira fix versions.
    #[serde(default, rename = "fixVersions", skip_serializing_if = "Vec::is_empty")]
    pub fix_versions: Vec<String>,
    /// Bugzilla target milestone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_milestone: Option<String>,
    /// Bugzilla flags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<Flag>,
    /// Id of the canonical issue when this one is a duplicate.
    #[serde(
        default,
        deserialize_with = "optional_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub dupe_of: Option<String>,
    /// Ids of clones of this issue.
    #[serde(default, deserialize_with = "strings_or_numbers")]
    pub clone_ids: Vec<String>,
    /// Id this issue was cloned from.
    #[serde(default, deserialize_with = "string_or_null")]
    pub cf_clone_of: String,
    /// Resolved clone records (Bugzilla).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clones: Vec<IssueRecord>,
    /// Derived: the issue still affects the product.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_open: Option<bool>,
    /// Derived: tests using the issue should be dropped from the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deselected: Option<bool>,
    /// Why this is a fallback record instead of tracker data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Uninterpreted tracker fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl IssueRecord {
    /// The conservative record used when a tracker cannot be consulted:
    /// open, never deselected.
    pub fn fallback(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_open: Some(true),
            is_deselected: Some(false),
            error: Some(reason.into()),
            ..Self::default()
        }
    }

    /// True for records produced by [`IssueRecord::fallback`].
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(i64),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Scalar::deserialize(deserializer)?.into_string())
}

fn string_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(Scalar::into_string).unwrap_or_default())
}

fn optional_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<Scalar>::deserialize(deserializer)?.map(Scalar::into_string);
    Ok(value.filter(|s| !s.is_empty()))
}

fn strings_or_numbers<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let values = Option::<Vec<Scalar>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values.into_iter().map(Scalar::into_string).collect())
}
