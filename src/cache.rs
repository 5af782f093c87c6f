//! Cache files: the resolved index persisted between runs.
//!
//! Each file is a JSON object keyed by `"<TAG>:<id>"` plus a `_meta` entry
//! describing the run that wrote it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::issue::{IssueIndex, TrackerKind};
use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;
use crate::version::Version;

/// Key holding run metadata in a cache file.
pub const META_KEY: &str = "_meta";

/// File name of the cache for `kind`.
#[must_use]
pub fn file_name(kind: TrackerKind) -> &'static str {
    match kind {
        TrackerKind::Bugzilla => "bz_cache.json",
        TrackerKind::Jira => "jr_cache.json",
    }
}

/// Path of the cache for `kind` inside `dir`.
#[must_use]
pub fn cache_path(dir: &Path, kind: TrackerKind) -> PathBuf {
    dir.join(file_name(kind))
}

/// Metadata describing the run that wrote a cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMeta {
    /// Product version the issues were judged against.
    pub version: String,
    /// Product server hostname.
    #[serde(default)]
    pub hostname: Option<String>,
    /// When the file was written.
    pub created: DateTime<Utc>,
    /// Unique id of the writing run.
    pub run_id: String,
    /// Command-line arguments of the writing run.
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory of the writing run.
    #[serde(default)]
    pub pwd: String,
}

impl RunMeta {
    /// Describes the current run.
    #[must_use]
    pub fn capture(clock: &dyn Clock, version: String, hostname: Option<String>) -> Self {
        Self {
            version,
            hostname,
            created: clock.now(),
            run_id: Uuid::new_v4().to_string(),
            args: std::env::args().collect(),
            pwd: std::env::current_dir().map(|p| p.display().to_string()).unwrap_or_default(),
        }
    }
}

/// One parsed cache file.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheFile {
    /// The cached issues.
    pub index: IssueIndex,
    /// The `_meta` entry, absent or unreadable in hand-written files.
    pub meta: Option<RunMeta>,
}

impl CacheFile {
    /// True when the file was written for a server at `version`.
    #[must_use]
    pub fn matches_version(&self, version: &Version) -> bool {
        self.meta
            .as_ref()
            .and_then(|meta| Version::extract(&meta.version))
            .is_some_and(|written| &written == version)
    }
}

/// Which cache files were asked for, and which of them already existed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePlan {
    dir: PathBuf,
    requested: Vec<TrackerKind>,
    existing: Vec<TrackerKind>,
}

impl CachePlan {
    /// Plans caching of `requested` trackers in `dir`, noting existing files.
    #[must_use]
    pub fn new(fs: &dyn FileSystem, dir: impl Into<PathBuf>, requested: Vec<TrackerKind>) -> Self {
        let dir = dir.into();
        let existing =
            requested.iter().copied().filter(|kind| fs.exists(&cache_path(&dir, *kind))).collect();
        Self { dir, requested, existing }
    }

    /// True when no cache flag was given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requested.is_empty()
    }

    /// Loads and merges every requested cache file that exists.
    ///
    /// Missing files are not an error: they are logged and written at the
    /// end of the run instead. Files written for another server version keep
    /// their tracker data, but open and deselect verdicts are derived again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cache`] when an existing file cannot be read or parsed.
    pub fn load(&self, fs: &dyn FileSystem, server_version: &Version) -> Result<IssueIndex> {
        let mut merged = IssueIndex::new();
        for kind in &self.requested {
            let path = cache_path(&self.dir, *kind);
            if !self.existing.contains(kind) {
                warn!(
                    path = %path.display(),
                    "Cache file not found, it will be written after this run"
                );
                continue;
            }
            let mut file = load(fs, &path)?;
            if !file.matches_version(server_version) {
                info!(
                    path = %path.display(),
                    written_for = file.meta.as_ref().map_or("unknown", |m| m.version.as_str()),
                    %server_version,
                    "Cache written for another version, recomputing issue status"
                );
                file.index.forget_derived_status();
            }
            info!(path = %path.display(), issues = file.index.len(), "Using cached issue data");
            for (issue, entry) in file.index.iter() {
                *merged.entry_mut(issue) = entry.clone();
            }
        }
        Ok(merged)
    }

    /// Writes `index` to every requested cache file that did not exist.
    ///
    /// Returns the paths written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cache`] when serialization or a write fails.
    pub fn store(
        &self,
        fs: &dyn FileSystem,
        index: &IssueIndex,
        meta: &RunMeta,
    ) -> Result<Vec<PathBuf>> {
        let pending: Vec<PathBuf> = self
            .requested
            .iter()
            .filter(|kind| !self.existing.contains(kind))
            .map(|kind| cache_path(&self.dir, *kind))
            .collect();
        if pending.is_empty() {
            return Ok(pending);
        }
        let contents = render(index, meta)?;
        for path in &pending {
            fs.write(path, &contents).map_err(|e| Error::Cache {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            info!(path = %path.display(), issues = index.len(), "Wrote issue cache");
        }
        Ok(pending)
    }
}

/// Reads one cache file.
///
/// # Errors
///
/// Returns [`Error::Cache`] when the file cannot be read or is not a cache.
pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<CacheFile> {
    let cache_error = |message: String| Error::Cache { path: path.display().to_string(), message };
    let contents = fs.read_to_string(path).map_err(|e| cache_error(e.to_string()))?;
    parse(&contents).map_err(|e| cache_error(e.to_string()))
}

/// Parses cache file contents, splitting off `_meta`.
///
/// # Errors
///
/// Returns a JSON error when the contents are not a cache object.
pub fn parse(contents: &str) -> std::result::Result<CacheFile, serde_json::Error> {
    let mut object: Map<String, Value> = serde_json::from_str(contents)?;
    let meta = object.remove(META_KEY).and_then(|value| serde_json::from_value(value).ok());
    let index = serde_json::from_value(Value::Object(object))?;
    Ok(CacheFile { index, meta })
}

/// Renders `index` plus `meta` as 4-space indented JSON.
///
/// # Errors
///
/// Returns [`Error::Json`] if a record cannot be serialized.
pub fn render(index: &IssueIndex, meta: &RunMeta) -> Result<String> {
    let mut value = serde_json::to_value(index)?;
    if let Value::Object(object) = &mut value {
        object.insert(META_KEY.to_string(), serde_json::to_value(meta)?);
    }

    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
