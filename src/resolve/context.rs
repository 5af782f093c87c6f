//! Per-run issue state: the index being resolved plus every cache layer.
//!
//! Lookups go memo first, then cache-file data, then one remote batch per
//! tracker for whatever is still missing.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use super::duplicates::{follow_duplicates, MAX_DUPLICATE_DEPTH};
use super::retry::{fetch_with_retry, RetryPolicy};
use super::rules;
use crate::context::ServiceContext;
use crate::error::Result;
use crate::issue::{IssueIndex, IssueRecord, IssueRef, TrackerKind};
use crate::version::Version;

type MemoKey = (TrackerKind, Vec<String>);

/// Holds everything the resolver knows during one invocation.
pub struct IssueContext {
    server_version: Version,
    policy: RetryPolicy,
    index: IssueIndex,
    cached: HashMap<IssueRef, IssueRecord>,
    memo: HashMap<MemoKey, Vec<IssueRecord>>,
}

impl IssueContext {
    /// Creates a context resolving `index` against a server at `server_version`.
    #[must_use]
    pub fn new(server_version: Version, policy: RetryPolicy, index: IssueIndex) -> Self {
        Self { server_version, policy, index, cached: HashMap::new(), memo: HashMap::new() }
    }

    /// Seeds the cache layer with records from a previously written index.
    #[must_use]
    pub fn with_cache(mut self, cache: IssueIndex) -> Self {
        for (issue, entry) in cache.iter() {
            if let Some(data) = &entry.data {
                self.cached.insert(issue.clone(), data.clone());
            }
        }
        self
    }

    /// The product version issues are judged against.
    #[must_use]
    pub fn server_version(&self) -> &Version {
        &self.server_version
    }

    /// The index as resolved so far.
    #[must_use]
    pub fn index(&self) -> &IssueIndex {
        &self.index
    }

    /// Fills `data` for every indexed issue that has none yet.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MalformedDuplicateChain`] when duplicate links
    /// loop or run too deep. Tracker failures are not errors: affected
    /// issues get fallback records.
    pub async fn resolve(&mut self, services: &ServiceContext) -> Result<()> {
        for kind in TrackerKind::ALL {
            self.resolve_kind(services, kind).await?;
        }
        Ok(())
    }

    /// Whether `issue` is open, fetching it first when it is not indexed.
    ///
    /// # Errors
    ///
    /// Same as [`IssueContext::resolve`].
    pub async fn is_open(&mut self, services: &ServiceContext, issue: &IssueRef) -> Result<bool> {
        self.ensure(services, issue).await?;
        self.open_status(issue)
    }

    /// Whether tests using `issue` should be deselected, fetching it first
    /// when it is not indexed.
    ///
    /// # Errors
    ///
    /// Same as [`IssueContext::resolve`].
    pub async fn should_deselect(
        &mut self,
        services: &ServiceContext,
        issue: &IssueRef,
    ) -> Result<bool> {
        self.ensure(services, issue).await?;
        self.deselect_status(issue)
    }

    /// Open status of an already resolved issue. Unknown issues count as open.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MalformedDuplicateChain`] on broken duplicate links.
    pub fn open_status(&self, issue: &IssueRef) -> Result<bool> {
        let Some(record) = self.index.record(issue) else {
            return Ok(true);
        };
        if let Some(open) = record.is_open {
            return Ok(open);
        }
        let target = follow_duplicates(&self.index, issue)?.unwrap_or(record);
        Ok(target
            .is_open
            .unwrap_or_else(|| rules::is_open(issue.kind, target, &self.server_version)))
    }

    /// Deselect status of an already resolved issue. Unknown issues are kept.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MalformedDuplicateChain`] on broken duplicate links.
    pub fn deselect_status(&self, issue: &IssueRef) -> Result<bool> {
        let Some(record) = self.index.record(issue) else {
            return Ok(false);
        };
        if let Some(deselected) = record.is_deselected {
            return Ok(deselected);
        }
        let target = follow_duplicates(&self.index, issue)?.unwrap_or(record);
        Ok(target.is_deselected.unwrap_or_else(|| rules::should_deselect(issue.kind, target)))
    }

    /// Records that tests using `issue` were deselected.
    pub fn mark_deselected(&mut self, issue: &IssueRef) {
        if let Some(data) = self.index.entry_mut(issue).data.as_mut() {
            data.is_deselected = Some(true);
        }
    }

    async fn ensure(&mut self, services: &ServiceContext, issue: &IssueRef) -> Result<()> {
        if self.index.record(issue).is_none() {
            self.index.entry_mut(issue);
            self.resolve_kind(services, issue.kind).await?;
        }
        Ok(())
    }

    async fn resolve_kind(&mut self, services: &ServiceContext, kind: TrackerKind) -> Result<()> {
        let pending: Vec<IssueRef> = self
            .index
            .iter()
            .filter(|(issue, entry)| issue.kind == kind && entry.data.is_none())
            .map(|(issue, _)| issue.clone())
            .collect();
        if pending.is_empty() {
            return Ok(());
        }
        info!(tracker = %kind, count = pending.len(), "Resolving issues");

        let ids: Vec<String> = pending.iter().map(|issue| issue.id.clone()).collect();
        for record in self.fetch_batch(services, kind, &ids).await {
            let issue = IssueRef::new(kind, record.id.clone());
            self.index.entry_mut(&issue).data = Some(record);
        }
        for issue in &pending {
            let entry = self.index.entry_mut(issue);
            if entry.data.is_none() {
                entry.data = Some(IssueRecord::fallback(&issue.id, "not returned by tracker"));
            }
        }

        self.fetch_duplicate_targets(services, kind).await;
        if kind == TrackerKind::Bugzilla {
            self.attach_clones(services).await;
        }
        self.derive_open(kind)
    }

    /// Pulls in the canonical issue behind every duplicate, transitively.
    async fn fetch_duplicate_targets(&mut self, services: &ServiceContext, kind: TrackerKind) {
        let mut queue: Vec<(String, usize)> = self
            .index
            .iter()
            .filter(|(issue, _)| issue.kind == kind)
            .filter_map(|(_, entry)| entry.data.as_ref())
            .filter(|record| rules::is_duplicate(kind, record))
            .filter_map(|record| record.dupe_of.clone())
            .map(|id| (id, 1))
            .collect();
        let mut seen = HashSet::new();

        while let Some((id, depth)) = queue.pop() {
            if depth > MAX_DUPLICATE_DEPTH || !seen.insert(id.clone()) {
                continue;
            }
            let issue = IssueRef::new(kind, id);
            if self.index.record(&issue).is_none() {
                debug!(%issue, "Fetching duplicate target");
                let record = self.fetch_single(services, &issue).await;
                let entry = self.index.entry_mut(&issue);
                entry.is_dupe = entry.used_in.is_empty();
                entry.data = Some(record);
            }
            if let Some(record) = self.index.record(&issue) {
                if rules::is_duplicate(kind, record) {
                    if let Some(next) = record.dupe_of.clone() {
                        queue.push((next, depth + 1));
                    }
                }
            }
        }
    }

    /// Fetches Bugzilla clones in one batch and attaches them to their parents.
    async fn attach_clones(&mut self, services: &ServiceContext) {
        let parents: Vec<(IssueRef, Vec<String>)> = self
            .index
            .iter()
            .filter(|(issue, _)| issue.kind == TrackerKind::Bugzilla)
            .filter_map(|(issue, entry)| {
                let record = entry.data.as_ref()?;
                let needs_clones = record.is_open.is_none()
                    && record.clones.is_empty()
                    && !record.clone_ids.is_empty();
                needs_clones.then(|| (issue.clone(), record.clone_ids.clone()))
            })
            .collect();
        if parents.is_empty() {
            return;
        }

        let ids: Vec<String> = parents.iter().flat_map(|(_, ids)| ids.iter().cloned()).collect();
        let clones = self.fetch_batch(services, TrackerKind::Bugzilla, &ids).await;
        for (issue, clone_ids) in parents {
            if let Some(record) = self.index.entry_mut(&issue).data.as_mut() {
                record.clones = clones
                    .iter()
                    .filter(|clone| !clone.is_fallback() && clone_ids.contains(&clone.id))
                    .cloned()
                    .collect();
            }
        }
    }

    /// Computes `is_open` once for every record of `kind` lacking it.
    fn derive_open(&mut self, kind: TrackerKind) -> Result<()> {
        let mut derived = Vec::new();
        for (issue, entry) in self.index.iter().filter(|(issue, _)| issue.kind == kind) {
            if entry.data.as_ref().is_some_and(|record| record.is_open.is_none()) {
                derived.push((issue.clone(), self.open_status(issue)?));
            }
        }
        for (issue, open) in derived {
            if let Some(record) = self.index.entry_mut(&issue).data.as_mut() {
                record.is_open = Some(open);
            }
        }
        Ok(())
    }

    async fn fetch_single(&mut self, services: &ServiceContext, issue: &IssueRef) -> IssueRecord {
        let records = self.fetch_batch(services, issue.kind, std::slice::from_ref(&issue.id)).await;
        records
            .into_iter()
            .find(|record| record.id == issue.id)
            .unwrap_or_else(|| IssueRecord::fallback(&issue.id, "not returned by tracker"))
    }

    /// Memo, then cache data, then one remote call for the rest.
    async fn fetch_batch(
        &mut self,
        services: &ServiceContext,
        kind: TrackerKind,
        ids: &[String],
    ) -> Vec<IssueRecord> {
        let mut wanted = ids.to_vec();
        wanted.sort();
        wanted.dedup();
        if wanted.is_empty() {
            return Vec::new();
        }
        let key = (kind, wanted);
        if let Some(hit) = self.memo.get(&key) {
            debug!(tracker = %kind, ids = ?key.1, "Memo hit");
            return hit.clone();
        }

        let mut records = Vec::new();
        let mut missing = Vec::new();
        for id in &key.1 {
            match self.cached.get(&IssueRef::new(kind, id.as_str())) {
                Some(record) => records.push(record.clone()),
                None => missing.push(id.clone()),
            }
        }
        if !missing.is_empty() {
            records.extend(self.fetch_remote(services, kind, &missing).await);
        }

        self.memo.insert(key, records.clone());
        records
    }

    async fn fetch_remote(
        &self,
        services: &ServiceContext,
        kind: TrackerKind,
        ids: &[String],
    ) -> Vec<IssueRecord> {
        let tracker = services.tracker(kind);
        if !tracker.has_credentials() {
            warn!(
                tracker = %kind,
                count = ids.len(),
                "No API key configured, treating issues as open"
            );
            return ids
                .iter()
                .map(|id| IssueRecord::fallback(id, "no API key configured"))
                .collect();
        }

        debug!(tracker = %kind, ?ids, "Calling tracker API");
        match fetch_with_retry(tracker, services.clock.as_ref(), self.policy, ids).await {
            Ok(mut records) => {
                for id in ids {
                    if !records.iter().any(|record| &record.id == id) {
                        warn!(tracker = %kind, %id, "Issue not found, treating as open");
                        records.push(IssueRecord::fallback(id, "not found in tracker"));
                    }
                }
                records
            }
            Err(e) => {
                warn!(tracker = %kind, error = %e, "Tracker unavailable, treating issues as open");
                ids.iter().map(|id| IssueRecord::fallback(id, e.to_string())).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::canned::{CannedTracker, FixedClock, MemoryFileSystem};
    use crate::error::Error;
    use crate::issue::IssueEntry;
    use chrono::Utc;
    use std::sync::Arc;
    use std::time::Duration;

    struct Harness {
        bugzilla: Arc<CannedTracker>,
        jira: Arc<CannedTracker>,
        clock: Arc<FixedClock>,
        services: ServiceContext,
    }

    fn harness(bugzilla: CannedTracker, jira: CannedTracker) -> Harness {
        let bugzilla = Arc::new(bugzilla);
        let jira = Arc::new(jira);
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let services = ServiceContext::new(
            Box::new(Arc::clone(&clock)),
            Box::new(MemoryFileSystem::new()),
            Box::new(Arc::clone(&bugzilla)),
            Box::new(Arc::clone(&jira)),
        );
        Harness { bugzilla, jira, clock, services }
    }

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    fn jr(id: &str) -> IssueRef {
        IssueRef::new(TrackerKind::Jira, id)
    }

    fn bz(id: &str) -> IssueRef {
        IssueRef::new(TrackerKind::Bugzilla, id)
    }

    fn jira_record(id: &str, status: &str, resolution: &str, fix: &[&str]) -> IssueRecord {
        IssueRecord {
            id: id.into(),
            status: status.into(),
            resolution: resolution.into(),
            fix_versions: fix.iter().map(|s| (*s).to_string()).collect(),
            ..IssueRecord::default()
        }
    }

    fn bug(id: &str, status: &str, resolution: &str, milestone: &str) -> IssueRecord {
        IssueRecord {
            id: id.into(),
            status: status.into(),
            resolution: resolution.into(),
            target_milestone: Some(milestone.into()),
            ..IssueRecord::default()
        }
    }

    fn index_of(issues: &[IssueRef]) -> IssueIndex {
        let mut index = IssueIndex::new();
        for issue in issues {
            index.entry_mut(issue);
        }
        index
    }

    fn resolving(issues: &[IssueRef]) -> IssueContext {
        IssueContext::new(v("6.11"), RetryPolicy::default(), index_of(issues))
    }

    fn empty_harness() -> Harness {
        harness(CannedTracker::new(TrackerKind::Bugzilla), CannedTracker::new(TrackerKind::Jira))
    }

    #[tokio::test]
    async fn resolves_each_tracker_in_one_batch() {
        let h = harness(
            CannedTracker::new(TrackerKind::Bugzilla).with_record(bug("1", "NEW", "", "---")),
            CannedTracker::new(TrackerKind::Jira)
                .with_record(jira_record("SAT-1", "Closed", "Done", &["6.10.0"]))
                .with_record(jira_record("SAT-2", "In Progress", "", &[])),
        );
        let index = index_of(&[bz("1"), jr("SAT-1"), jr("SAT-2")]);
        let mut ctx = IssueContext::new(v("6.11"), RetryPolicy::default(), index);
        ctx.resolve(&h.services).await.unwrap();

        assert_eq!(h.bugzilla.calls(), vec![vec!["1".to_string()]]);
        assert_eq!(h.jira.calls(), vec![vec!["SAT-1".to_string(), "SAT-2".to_string()]]);
        assert_eq!(ctx.index().record(&bz("1")).unwrap().is_open, Some(true));
        assert_eq!(ctx.index().record(&jr("SAT-1")).unwrap().is_open, Some(false));
        assert_eq!(ctx.index().record(&jr("SAT-2")).unwrap().is_open, Some(true));
    }

    #[tokio::test]
    async fn memo_is_keyed_by_sorted_ids() {
        let h = harness(
            CannedTracker::new(TrackerKind::Bugzilla),
            CannedTracker::new(TrackerKind::Jira)
                .with_record(jira_record("SAT-1", "New", "", &[]))
                .with_record(jira_record("SAT-2", "New", "", &[])),
        );
        let mut ctx = IssueContext::new(v("6.11"), RetryPolicy::default(), IssueIndex::new());
        let reversed = vec!["SAT-2".to_string(), "SAT-1".to_string()];
        let sorted = vec!["SAT-1".to_string(), "SAT-2".to_string()];
        let first = ctx.fetch_batch(&h.services, TrackerKind::Jira, &reversed).await;
        let second = ctx.fetch_batch(&h.services, TrackerKind::Jira, &sorted).await;

        assert_eq!(first, second);
        assert_eq!(h.jira.calls().len(), 1);
    }

    #[tokio::test]
    async fn cache_hits_skip_the_network_and_partial_hits_fetch_the_rest() {
        let h = harness(
            CannedTracker::new(TrackerKind::Bugzilla),
            CannedTracker::new(TrackerKind::Jira).with_record(jira_record("SAT-2", "New", "", &[])),
        );
        let cache: IssueIndex = [(
            jr("SAT-1"),
            IssueEntry {
                data: Some(jira_record("SAT-1", "Closed", "Done", &["6.10"])),
                ..IssueEntry::default()
            },
        )]
        .into_iter()
        .collect();

        let mut ctx = resolving(&[jr("SAT-1"), jr("SAT-2")]).with_cache(cache);
        ctx.resolve(&h.services).await.unwrap();

        assert_eq!(h.jira.calls(), vec![vec!["SAT-2".to_string()]]);
        assert!(!ctx.open_status(&jr("SAT-1")).unwrap());
        assert!(ctx.open_status(&jr("SAT-2")).unwrap());
    }

    #[tokio::test]
    async fn cached_derived_status_is_used_as_is() {
        let h = empty_harness();
        let mut cached = jira_record("SAT-1", "Closed", "Done", &["6.10"]);
        cached.is_open = Some(true);
        let cache: IssueIndex =
            [(jr("SAT-1"), IssueEntry { data: Some(cached), ..IssueEntry::default() })]
                .into_iter()
                .collect();

        let mut ctx = resolving(&[jr("SAT-1")]).with_cache(cache);
        ctx.resolve(&h.services).await.unwrap();

        assert!(ctx.open_status(&jr("SAT-1")).unwrap());
        assert!(h.jira.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_credentials_give_open_fallbacks_without_requests() {
        let h = harness(
            CannedTracker::new(TrackerKind::Bugzilla).without_credentials(),
            CannedTracker::new(TrackerKind::Jira).without_credentials(),
        );
        let mut ctx = resolving(&[bz("7"), jr("SAT-7")]);
        ctx.resolve(&h.services).await.unwrap();

        assert!(h.bugzilla.calls().is_empty());
        assert!(h.jira.calls().is_empty());
        for issue in [bz("7"), jr("SAT-7")] {
            let record = ctx.index().record(&issue).unwrap();
            assert!(record.is_fallback());
            assert_eq!(record.is_open, Some(true));
            assert!(!ctx.deselect_status(&issue).unwrap());
        }
    }

    #[tokio::test]
    async fn exhausted_retries_give_open_fallbacks() {
        let h = harness(
            CannedTracker::new(TrackerKind::Bugzilla),
            CannedTracker::new(TrackerKind::Jira)
                .with_record(jira_record("SAT-1", "Closed", "Done", &[]))
                .failing(10),
        );
        let mut ctx = resolving(&[jr("SAT-1")]);
        ctx.resolve(&h.services).await.unwrap();

        assert_eq!(h.jira.calls().len(), 4);
        assert_eq!(h.clock.sleeps(), vec![Duration::from_secs(20); 3]);
        let record = ctx.index().record(&jr("SAT-1")).unwrap();
        assert!(record.is_fallback());
        assert_eq!(record.is_open, Some(true));
    }

    #[tokio::test]
    async fn unknown_ids_get_fallbacks() {
        let h = empty_harness();
        let mut ctx = resolving(&[jr("SAT-404")]);
        ctx.resolve(&h.services).await.unwrap();

        assert!(ctx.index().record(&jr("SAT-404")).unwrap().is_fallback());
        assert!(ctx.open_status(&jr("SAT-404")).unwrap());
    }

    #[tokio::test]
    async fn duplicates_resolve_through_canonical_issue() {
        let mut dupe = bug("1", "CLOSED", "DUPLICATE", "---");
        dupe.dupe_of = Some("2".into());
        let h = harness(
            CannedTracker::new(TrackerKind::Bugzilla)
                .with_record(dupe)
                .with_record(bug("2", "CLOSED", "ERRATA", "6.10.0")),
            CannedTracker::new(TrackerKind::Jira),
        );
        let mut ctx = IssueContext::new(v("6.9"), RetryPolicy::default(), index_of(&[bz("1")]));
        ctx.resolve(&h.services).await.unwrap();

        let canonical = ctx.index().get(&bz("2")).unwrap();
        assert!(canonical.is_dupe);
        assert!(canonical.used_in.is_empty());
        assert!(ctx.open_status(&bz("1")).unwrap());
        assert_eq!(h.bugzilla.calls(), vec![vec!["1".to_string()], vec!["2".to_string()]]);
    }

    #[tokio::test]
    async fn duplicate_cycle_is_an_error() {
        let mut a = jira_record("SAT-1", "Closed", "Duplicate", &[]);
        a.dupe_of = Some("SAT-2".into());
        let mut b = jira_record("SAT-2", "Closed", "Duplicate", &[]);
        b.dupe_of = Some("SAT-1".into());
        let h = harness(
            CannedTracker::new(TrackerKind::Bugzilla),
            CannedTracker::new(TrackerKind::Jira).with_record(a).with_record(b),
        );
        let mut ctx = resolving(&[jr("SAT-1")]);

        let err = ctx.resolve(&h.services).await.unwrap_err();
        assert!(matches!(err, Error::MalformedDuplicateChain { .. }));
        assert_eq!(h.jira.calls().len(), 2);
    }

    #[tokio::test]
    async fn fixed_clone_closes_bugzilla_issue() {
        let mut parent = bug("1", "CLOSED", "ERRATA", "6.13.0");
        parent.clone_ids = vec!["3".into()];
        let h = harness(
            CannedTracker::new(TrackerKind::Bugzilla)
                .with_record(parent)
                .with_record(bug("3", "CLOSED", "ERRATA", "6.11.0")),
            CannedTracker::new(TrackerKind::Jira),
        );
        let mut ctx = resolving(&[bz("1")]);
        ctx.resolve(&h.services).await.unwrap();

        assert_eq!(ctx.index().record(&bz("1")).unwrap().clones.len(), 1);
        assert!(!ctx.open_status(&bz("1")).unwrap());
        assert!(!ctx.index().contains(&bz("3")));
    }

    #[tokio::test]
    async fn on_demand_lookup_fetches_single_issue() {
        let h = harness(
            CannedTracker::new(TrackerKind::Bugzilla),
            CannedTracker::new(TrackerKind::Jira)
                .with_record(jira_record("SAT-9", "Closed", "Obsolete", &[])),
        );
        let mut ctx = IssueContext::new(v("6.11"), RetryPolicy::default(), IssueIndex::new());

        assert!(ctx.is_open(&h.services, &jr("SAT-9")).await.unwrap());
        assert!(ctx.should_deselect(&h.services, &jr("SAT-9")).await.unwrap());
        assert_eq!(h.jira.calls(), vec![vec!["SAT-9".to_string()]]);
    }

    #[tokio::test]
    async fn mark_deselected_sticks() {
        let h = harness(
            CannedTracker::new(TrackerKind::Bugzilla),
            CannedTracker::new(TrackerKind::Jira)
                .with_record(jira_record("SAT-3", "Closed", "Obsolete", &[])),
        );
        let mut ctx = resolving(&[jr("SAT-3")]);
        ctx.resolve(&h.services).await.unwrap();
        ctx.mark_deselected(&jr("SAT-3"));

        assert_eq!(ctx.index().record(&jr("SAT-3")).unwrap().is_deselected, Some(true));
    }
}
