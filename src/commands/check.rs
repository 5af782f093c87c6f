//! `issuegate check` command.

use std::fmt::Write as _;

use serde::Serialize;

use crate::cache::CachePlan;
use crate::cli::{CheckArgs, OutputFormat};
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::error::Result;
use crate::issue::{IssueIndex, IssueRef};
use crate::resolve::IssueContext;

/// Status of one checked issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueStatus {
    /// The issue.
    pub issue: IssueRef,
    /// Tracker status, empty for fallback records.
    pub status: String,
    /// Tracker resolution.
    pub resolution: String,
    /// Tests guarded by the issue are skipped.
    pub is_open: bool,
    /// Tests using the issue are dropped.
    pub should_deselect: bool,
    /// Why tracker data was unavailable, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Execute the `check` command and render its report.
///
/// Cache files are read when requested but never written.
///
/// # Errors
///
/// Returns an error if a cache file cannot be read or duplicate links are broken.
pub async fn run(settings: &Settings, ctx: &ServiceContext, args: &CheckArgs) -> Result<String> {
    let statuses = execute(settings, ctx, args).await?;
    match args.format {
        OutputFormat::Text => Ok(render_text(&statuses)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&statuses)? + "\n"),
    }
}

/// Resolves each requested issue on demand.
///
/// # Errors
///
/// Same as [`run`].
pub async fn execute(
    settings: &Settings,
    ctx: &ServiceContext,
    args: &CheckArgs,
) -> Result<Vec<IssueStatus>> {
    let fs = ctx.fs.as_ref();
    let server_version = settings.server_version();
    let cached = CachePlan::new(fs, &args.cache.cache_dir, args.cache.requested())
        .load(fs, &server_version)?;
    let mut issues = IssueContext::new(server_version, settings.retry_policy(), IssueIndex::new())
        .with_cache(cached);

    let mut statuses = Vec::with_capacity(args.issues.len());
    for issue in &args.issues {
        let is_open = issues.is_open(ctx, issue).await?;
        let should_deselect = issues.should_deselect(ctx, issue).await?;
        let record = issues.index().record(issue).cloned().unwrap_or_default();
        statuses.push(IssueStatus {
            issue: issue.clone(),
            status: record.status,
            resolution: record.resolution,
            is_open,
            should_deselect,
            error: record.error,
        });
    }
    Ok(statuses)
}

fn render_text(statuses: &[IssueStatus]) -> String {
    let mut out = String::new();
    for s in statuses {
        let state = match (s.status.as_str(), s.resolution.as_str()) {
            ("", _) => "unknown".to_string(),
            (status, "") => status.to_string(),
            (status, resolution) => format!("{status}/{resolution}"),
        };
        let _ = write!(
            out,
            "{}  {state}  is_open={}  should_deselect={}",
            s.issue, s.is_open, s.should_deselect
        );
        if let Some(error) = &s.error {
            let _ = write!(out, "  ({error})");
        }
        out.push('\n');
    }
    out
}
