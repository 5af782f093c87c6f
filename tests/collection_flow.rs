//! End-to-end collection passes over canned adapters.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use issuegate::adapters::canned::{CannedTracker, FixedClock, MemoryFileSystem};
use issuegate::apply::Outcome;
use issuegate::cli::{CacheArgs, CollectArgs, OutputFormat};
use issuegate::commands::collect::execute;
use issuegate::config::Settings;
use issuegate::context::ServiceContext;
use issuegate::issue::{IssueRecord, TrackerKind};
use issuegate::Error;

const MANIFEST: &str = r#"
modules:
  - name: tests.foreman.api.test_repository
    path: tests/foreman/api/test_repository.py
    docstring: |
      Repository tests.

      :CaseComponent: Repositories
    source: |
      if is_open('BZ:1700001'):
          pass
items:
  - node_id: tests/foreman/api/test_repository.py::test_sync
    module: tests.foreman.api.test_repository
    location: {path: tests/foreman/api/test_repository.py, line: 10, name: test_sync}
    markers:
      - {name: skip_if_open, args: ['JR:SAT-1']}
  - node_id: tests/foreman/api/test_repository.py::test_old_api
    module: tests.foreman.api.test_repository
    location: {path: tests/foreman/api/test_repository.py, line: 30, name: test_old_api}
    markers:
      - {name: deselect, kwargs: {reason: 'JR:SAT-2'}}
  - node_id: tests/foreman/api/test_repository.py::test_upload
    module: tests.foreman.api.test_repository
    location: {path: tests/foreman/api/test_repository.py, line: 50, name: test_upload}
    function_docstring: |
      Upload content.

      :BZ: 123456
  - node_id: tests/robottelo/test_issue_handlers.py::test_unit
    module: tests.robottelo.test_issue_handlers
    location: {path: tests/robottelo/test_issue_handlers.py, line: 3, name: test_unit}
"#;

fn jira(id: &str, status: &str, resolution: &str, fix: &[&str]) -> IssueRecord {
    IssueRecord {
        id: id.into(),
        status: status.into(),
        resolution: resolution.into(),
        fix_versions: fix.iter().map(|s| (*s).to_string()).collect(),
        ..IssueRecord::default()
    }
}

struct Flow {
    fs: Arc<MemoryFileSystem>,
    jira: Arc<CannedTracker>,
    bugzilla: Arc<CannedTracker>,
    ctx: ServiceContext,
}

fn flow(fs: MemoryFileSystem) -> Flow {
    let fs = Arc::new(fs.with_file("/suite/manifest.yaml", MANIFEST));
    let jira = Arc::new(
        CannedTracker::new(TrackerKind::Jira)
            .with_record(jira("SAT-1", "Closed", "Done", &["6.10"]))
            .with_record(jira("SAT-2", "Closed", "Obsolete", &[])),
    );
    let bugzilla = Arc::new(CannedTracker::new(TrackerKind::Bugzilla).with_record(IssueRecord {
        id: "1700001".into(),
        status: "NEW".into(),
        ..IssueRecord::default()
    }));
    let ctx = ServiceContext::new(
        Box::new(FixedClock::new(Utc::now())),
        Box::new(Arc::clone(&fs)),
        Box::new(Arc::clone(&bugzilla)),
        Box::new(Arc::clone(&jira)),
    );
    Flow { fs, jira, bugzilla, ctx }
}

fn settings(version: &str) -> Settings {
    let mut settings = Settings::default();
    settings.server.version = Some(version.into());
    settings.server.hostname = Some("sat.example.com".into());
    settings
}

fn args() -> CollectArgs {
    CollectArgs {
        manifest: PathBuf::from("/suite/manifest.yaml"),
        bz: None,
        jr: None,
        format: OutputFormat::Text,
        cache: CacheArgs { bz_cache: false, jr_cache: false, cache_dir: PathBuf::from("/suite") },
    }
}

const SYNC: &str = "tests/foreman/api/test_repository.py::test_sync";
const OLD_API: &str = "tests/foreman/api/test_repository.py::test_old_api";
const UPLOAD: &str = "tests/foreman/api/test_repository.py::test_upload";
const UNIT: &str = "tests/robottelo/test_issue_handlers.py::test_unit";

#[tokio::test]
async fn fixed_in_older_release_is_not_skipped() {
    let flow = flow(MemoryFileSystem::new());
    let report = execute(&settings("6.11"), &flow.ctx, &args()).await.unwrap();

    assert_eq!(report.outcome(SYNC), Some(&Outcome::Selected { skip: None }));
}

#[tokio::test]
async fn fixed_in_newer_release_is_skipped() {
    let flow = flow(MemoryFileSystem::new());
    let report = execute(&settings("6.9"), &flow.ctx, &args()).await.unwrap();

    assert_eq!(
        report.outcome(SYNC),
        Some(&Outcome::Selected { skip: Some("JR:SAT-1".into()) })
    );
}

#[tokio::test]
async fn obsolete_issue_deselects_and_others_pass() {
    let flow = flow(MemoryFileSystem::new());
    let report = execute(&settings("6.11"), &flow.ctx, &args()).await.unwrap();

    assert!(matches!(report.outcome(OLD_API), Some(Outcome::Deselected { .. })));
    assert_eq!(report.outcome(UPLOAD), Some(&Outcome::Selected { skip: None }));
    assert_eq!(report.outcome(UNIT), Some(&Outcome::Selected { skip: None }));
    assert_eq!(flow.jira.calls(), vec![vec!["SAT-1".to_string(), "SAT-2".to_string()]]);
    assert_eq!(flow.bugzilla.calls(), vec![vec!["1700001".to_string()]]);
}

#[tokio::test]
async fn bz_filter_keeps_only_matching_items() {
    let flow = flow(MemoryFileSystem::new());
    let mut args = args();
    args.bz = Some(vec!["123456".into()]);
    let report = execute(&settings("6.11"), &flow.ctx, &args).await.unwrap();

    assert_eq!(report.selected().collect::<Vec<_>>(), vec![UPLOAD]);
    assert!(matches!(report.outcome(SYNC), Some(Outcome::Deselected { .. })));
    assert!(matches!(report.outcome(UNIT), Some(Outcome::Deselected { .. })));
}

#[tokio::test]
async fn cache_round_trip_avoids_remote_calls() {
    let first = flow(MemoryFileSystem::new());
    let mut args = args();
    args.cache.bz_cache = true;
    args.cache.jr_cache = true;
    let original = execute(&settings("6.11"), &first.ctx, &args).await.unwrap();

    let bz_cache = first.fs.contents(&PathBuf::from("/suite/bz_cache.json")).unwrap();
    let jr_cache = first.fs.contents(&PathBuf::from("/suite/jr_cache.json")).unwrap();
    assert_eq!(bz_cache, jr_cache);
    assert!(jr_cache.contains("\"_meta\""));
    assert!(jr_cache.contains("\"hostname\": \"sat.example.com\""));
    assert!(jr_cache.contains("\"is_deselected\": true"));

    let second = flow(
        MemoryFileSystem::new()
            .with_file("/suite/bz_cache.json", bz_cache.clone())
            .with_file("/suite/jr_cache.json", jr_cache.clone()),
    );
    let replayed = execute(&settings("6.11"), &second.ctx, &args).await.unwrap();

    assert_eq!(replayed, original);
    assert!(second.jira.calls().is_empty());
    assert!(second.bugzilla.calls().is_empty());
    assert_eq!(second.fs.contents(&PathBuf::from("/suite/jr_cache.json")), Some(jr_cache));
}

#[tokio::test]
async fn cache_from_other_release_is_judged_again() {
    let first = flow(MemoryFileSystem::new());
    let mut args = args();
    args.cache.jr_cache = true;
    let written = execute(&settings("6.11"), &first.ctx, &args).await.unwrap();
    assert_eq!(written.outcome(SYNC), Some(&Outcome::Selected { skip: None }));
    let jr_cache = first.fs.contents(&PathBuf::from("/suite/jr_cache.json")).unwrap();

    let second = flow(MemoryFileSystem::new().with_file("/suite/jr_cache.json", jr_cache));
    let replayed = execute(&settings("6.9"), &second.ctx, &args).await.unwrap();

    assert_eq!(
        replayed.outcome(SYNC),
        Some(&Outcome::Selected { skip: Some("JR:SAT-1".into()) })
    );
    assert!(matches!(replayed.outcome(OLD_API), Some(Outcome::Deselected { .. })));
    assert!(second.jira.calls().is_empty());
}

#[tokio::test]
async fn duplicate_cycle_fails_the_pass() {
    let mut a = jira("SAT-1", "Closed", "Duplicate", &[]);
    a.dupe_of = Some("SAT-9".into());
    let mut b = jira("SAT-9", "Closed", "Duplicate", &[]);
    b.dupe_of = Some("SAT-1".into());
    let fs = Arc::new(MemoryFileSystem::new().with_file("/suite/manifest.yaml", MANIFEST));
    let ctx = ServiceContext::new(
        Box::new(FixedClock::new(Utc::now())),
        Box::new(fs),
        Box::new(CannedTracker::new(TrackerKind::Bugzilla)),
        Box::new(CannedTracker::new(TrackerKind::Jira).with_record(a).with_record(b)),
    );

    let err = execute(&settings("6.11"), &ctx, &args()).await.unwrap_err();
    assert!(matches!(err, Error::MalformedDuplicateChain { .. }));
    assert!(err.to_string().contains("JR:SAT-1 -> JR:SAT-9 -> JR:SAT-1"));
}
