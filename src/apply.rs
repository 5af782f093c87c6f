//! Applier: turns resolved issue state into per-item selection decisions.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::Serialize;
use tracing::debug;

use crate::collect::CollectedItem;
use crate::context::ServiceContext;
use crate::error::Result;
use crate::issue::TrackerKind;
use crate::resolve::IssueContext;

/// `--BZ` / `--JR` selection filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerFilters {
    bugzilla: Option<BTreeSet<String>>,
    jira: Option<BTreeSet<String>>,
}

impl TrackerFilters {
    /// Builds filters from the raw flag values. `None` means the flag was not
    /// given; a flag holding only blank ids is treated the same way.
    #[must_use]
    pub fn new(bugzilla: Option<Vec<String>>, jira: Option<Vec<String>>) -> Self {
        let clean = |ids: Vec<String>| -> Option<BTreeSet<String>> {
            let ids: BTreeSet<String> = ids
                .iter()
                .map(|id| id.trim())
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
            (!ids.is_empty()).then_some(ids)
        };
        Self { bugzilla: bugzilla.and_then(clean), jira: jira.and_then(clean) }
    }

    fn filter(&self, kind: TrackerKind) -> Option<&BTreeSet<String>> {
        match kind {
            TrackerKind::Bugzilla => self.bugzilla.as_ref(),
            TrackerKind::Jira => self.jira.as_ref(),
        }
    }

    /// An item passes when, for every tracker, the filter is absent or
    /// shares an id with the item's derived marker set.
    #[must_use]
    pub fn admits(&self, item: &CollectedItem) -> bool {
        TrackerKind::ALL.into_iter().all(|kind| {
            self.filter(kind).map_or(true, |wanted| !wanted.is_disjoint(item.marks(kind)))
        })
    }
}

/// What happens to one collected item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The item runs, possibly as a conditional skip.
    Selected {
        /// Skip reason when the guarding issue is open.
        #[serde(skip_serializing_if = "Option::is_none")]
        skip: Option<String>,
    },
    /// The item is removed from the run.
    Deselected {
        /// Why it was removed.
        reason: String,
    },
}

/// Decision for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    /// Runner node id.
    pub node_id: String,
    /// The decision.
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Decisions for a whole collection, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    /// One report per item.
    pub items: Vec<ItemReport>,
}

impl CollectionReport {
    /// Node ids of items that run (skipped ones included).
    pub fn selected(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Selected { .. }))
            .map(|r| r.node_id.as_str())
    }

    /// Node ids of items that run as skips.
    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Selected { skip: Some(_) }))
            .map(|r| r.node_id.as_str())
    }

    /// Node ids of deselected items.
    pub fn deselected(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Deselected { .. }))
            .map(|r| r.node_id.as_str())
    }

    /// The outcome for `node_id`, if the item was collected.
    #[must_use]
    pub fn outcome(&self, node_id: &str) -> Option<&Outcome> {
        self.items.iter().find(|r| r.node_id == node_id).map(|r| &r.outcome)
    }

    /// Human-readable listing with a summary line.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            let _ = match &item.outcome {
                Outcome::Selected { skip: None } => writeln!(out, "SELECTED    {}", item.node_id),
                Outcome::Selected { skip: Some(reason) } => {
                    writeln!(out, "SKIPPED     {} ({reason})", item.node_id)
                }
                Outcome::Deselected { reason } => {
                    writeln!(out, "DESELECTED  {} ({reason})", item.node_id)
                }
            };
        }
        let _ = writeln!(
            out,
            "{} selected, {} skipped, {} deselected",
            self.selected().count(),
            self.skipped().count(),
            self.deselected().count()
        );
        out
    }
}

/// Decides every item's outcome against the resolved issue state.
///
/// Obsolete primary issues deselect regardless of filters; then the
/// tracker filters apply; then `skip_if_open` turns open issues into skips.
/// Issues not yet in the index are looked up on demand.
///
/// # Errors
///
/// Returns [`crate::Error::MalformedDuplicateChain`] from the resolver.
pub async fn apply(
    issues: &mut IssueContext,
    services: &ServiceContext,
    items: &[CollectedItem],
    filters: &TrackerFilters,
) -> Result<CollectionReport> {
    let mut report = CollectionReport::default();
    for item in items {
        let outcome = decide(issues, services, item, filters).await?;
        if let Outcome::Deselected { reason } = &outcome {
            debug!(node_id = %item.node_id, %reason, "Deselecting");
        }
        report.items.push(ItemReport { node_id: item.node_id.clone(), outcome });
    }
    Ok(report)
}

async fn decide(
    issues: &mut IssueContext,
    services: &ServiceContext,
    item: &CollectedItem,
    filters: &TrackerFilters,
) -> Result<Outcome> {
    if let Some(primary) = &item.primary {
        if issues.should_deselect(services, primary).await? {
            issues.mark_deselected(primary);
            return Ok(Outcome::Deselected { reason: format!("{primary} is closed as obsolete") });
        }
    }
    if !filters.admits(item) {
        return Ok(Outcome::Deselected { reason: "not matched by --BZ/--JR filter".to_string() });
    }
    if let Some(guard) = &item.skip_if_open {
        if issues.is_open(services, guard).await? {
            return Ok(Outcome::Selected { skip: Some(guard.to_string()) });
        }
    }
    Ok(Outcome::Selected { skip: None })
}
