//! Builds the collected-issue index from a manifest.

use std::collections::BTreeSet;

use tracing::debug;

use super::docstring::{self, component_slug, DocFields};
use super::manifest::{CollectionManifest, Location, Marker, TestItem};
use super::source;
use crate::error::{Error, Result};
use crate::issue::{IssueIndex, IssueRef, TrackerKind, UsageRecord};

/// Markers that carry an issue reference.
pub const ISSUE_MARKERS: [&str; 3] = ["skip_if_open", "skip", "deselect"];

/// Per-item facts the applier needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedItem {
    /// Runner node id.
    pub node_id: String,
    /// Where the item is defined.
    pub location: Location,
    /// Derived `BZ` marker: Bugzilla ids the item refers to.
    pub bz_marks: BTreeSet<String>,
    /// Derived `JR` marker: Jira keys the item refers to.
    pub jr_marks: BTreeSet<String>,
    /// Issue named by the item's `skip_if_open` marker.
    pub skip_if_open: Option<IssueRef>,
    /// First issue named by an explicit issue marker.
    pub primary: Option<IssueRef>,
    /// The item matched an excluded prefix and was not scanned.
    pub excluded: bool,
}

impl CollectedItem {
    /// The derived marker set for `kind`.
    #[must_use]
    pub fn marks(&self, kind: TrackerKind) -> &BTreeSet<String> {
        match kind {
            TrackerKind::Bugzilla => &self.bz_marks,
            TrackerKind::Jira => &self.jr_marks,
        }
    }

    fn marks_mut(&mut self, kind: TrackerKind) -> &mut BTreeSet<String> {
        match kind {
            TrackerKind::Bugzilla => &mut self.bz_marks,
            TrackerKind::Jira => &mut self.jr_marks,
        }
    }
}

/// Output of a collection pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    /// Issue usage index, with empty `data`.
    pub index: IssueIndex,
    /// One entry per manifest item, in manifest order.
    pub items: Vec<CollectedItem>,
}

/// Scans test items for issue references.
#[derive(Debug, Clone, Default)]
pub struct Collector {
    exclude_prefixes: Vec<String>,
}

/// Component and importance attached to every usage of one item.
struct UsageContext<'a> {
    location: &'a Location,
    component: Option<String>,
    importance: Option<String>,
}

impl UsageContext<'_> {
    fn usage(&self, usage: &str) -> UsageRecord {
        UsageRecord {
            filepath: self.location.path.clone(),
            lineno: self.location.line,
            testcase: self.location.name.clone(),
            component: self.component.clone(),
            importance: self.importance.clone(),
            component_mark: self.component.as_deref().map(component_slug),
            usage: usage.to_string(),
        }
    }
}

impl Collector {
    /// Creates a collector that skips items whose node id starts with any
    /// of `exclude_prefixes`.
    #[must_use]
    pub fn new(exclude_prefixes: Vec<String>) -> Self {
        Self { exclude_prefixes }
    }

    fn is_excluded(&self, item: &TestItem) -> bool {
        self.exclude_prefixes.iter().any(|p| item.node_id.starts_with(p.as_str()))
    }

    /// Builds the index and per-item derived markers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedMarker`] when an issue marker lacks its
    /// issue reference.
    pub fn collect(&self, manifest: &CollectionManifest) -> Result<Collection> {
        let mut collection = Collection::default();
        let mut scanned_modules: Vec<&str> = Vec::new();

        for item in &manifest.items {
            let mut collected = CollectedItem {
                node_id: item.node_id.clone(),
                location: item.location.clone(),
                bz_marks: BTreeSet::new(),
                jr_marks: BTreeSet::new(),
                skip_if_open: skip_if_open_ref(item)?,
                primary: None,
                excluded: self.is_excluded(item),
            };

            if collected.excluded {
                collection.items.push(collected);
                continue;
            }
            if !scanned_modules.contains(&item.module.as_str()) {
                scanned_modules.push(item.module.as_str());
            }

            // Top-down: module, class, function.
            let module_doc = manifest.module(&item.module).and_then(|m| m.docstring.as_deref());
            let docs: Vec<DocFields> =
                [module_doc, item.class_docstring.as_deref(), item.function_docstring.as_deref()]
                    .into_iter()
                    .flatten()
                    .map(docstring::parse)
                    .collect();
            for fields in &docs {
                collected.bz_marks.extend(fields.bz.iter().cloned());
                collected.jr_marks.extend(fields.jr.iter().cloned());
            }

            let ctx = UsageContext {
                location: &item.location,
                component: item
                    .closest_marker("component")
                    .and_then(Marker::first_arg)
                    .map(str::to_string)
                    .or_else(|| docs.iter().rev().find_map(|d| d.component.clone())),
                importance: item
                    .closest_marker("importance")
                    .and_then(Marker::first_arg)
                    .map(str::to_string)
                    .or_else(|| docs.iter().rev().find_map(|d| d.importance.clone())),
            };

            let issue_markers =
                item.markers.iter().filter(|m| ISSUE_MARKERS.contains(&m.name.as_str()));
            for marker in issue_markers {
                let Some(issue) = marker_issue(item, marker)? else {
                    debug!(
                        node_id = %item.node_id,
                        marker = %marker.name,
                        "marker reason is not an issue reference"
                    );
                    continue;
                };
                collection.index.add_usage(&issue, ctx.usage(&marker.name));
                collected.marks_mut(issue.kind).insert(issue.id.clone());
                collected.primary.get_or_insert(issue);
            }

            for site in source::scan(&item.source) {
                collection.index.add_usage(&site.issue, ctx.usage(site.usage()));
            }

            collection.items.push(collected);
        }

        // `is_open` guards outside test functions, e.g. setup code.
        for module in scanned_modules.iter().filter_map(|name| manifest.module(name)) {
            let location =
                Location { path: module.path.clone(), line: 1, name: module.name.clone() };
            let ctx = UsageContext {
                location: &location,
                component: docstring::find_component(&module.source),
                importance: None,
            };
            for site in source::scan(&module.source) {
                if !collection.index.contains(&site.issue) {
                    collection.index.add_usage(&site.issue, ctx.usage(site.usage()));
                }
            }
        }

        Ok(collection)
    }
}

/// The issue named by an item's `skip_if_open` marker; the marker must
/// name a valid reference.
fn skip_if_open_ref(item: &TestItem) -> Result<Option<IssueRef>> {
    let Some(marker) = item.closest_marker("skip_if_open") else {
        return Ok(None);
    };
    let malformed =
        || Error::MalformedMarker { node_id: item.node_id.clone(), marker: marker.name.clone() };
    let argument = marker.issue_argument().ok_or_else(malformed)?;
    argument.parse().map(Some).map_err(|_| malformed())
}

/// The issue named by an explicit issue marker.
///
/// `skip_if_open` must name a valid reference. `skip` and `deselect` must
/// carry an argument, but a free-text reason is not an issue and yields `None`.
fn marker_issue(item: &TestItem, marker: &Marker) -> Result<Option<IssueRef>> {
    let malformed =
        || Error::MalformedMarker { node_id: item.node_id.clone(), marker: marker.name.clone() };
    let argument = marker.issue_argument().ok_or_else(malformed)?;
    match argument.parse::<IssueRef>() {
        Ok(issue) => Ok(Some(issue)),
        Err(_) if marker.name == "skip_if_open" => Err(malformed()),
        Err(_) => Ok(None),
    }
}
