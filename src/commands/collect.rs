//! `issuegate collect` command.

use tracing::info;

use crate::apply::{apply, CollectionReport, TrackerFilters};
use crate::cache::{CachePlan, RunMeta};
use crate::cli::{CollectArgs, OutputFormat};
use crate::collect::{CollectionManifest, Collector};
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::error::Result;
use crate::resolve::IssueContext;

/// Execute the `collect` command and render its report.
///
/// # Errors
///
/// Returns an error if the manifest or a cache file cannot be read, a
/// marker is malformed, or duplicate links are broken.
pub async fn run(settings: &Settings, ctx: &ServiceContext, args: &CollectArgs) -> Result<String> {
    let report = execute(settings, ctx, args).await?;
    match args.format {
        OutputFormat::Text => Ok(report.render_text()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&report)? + "\n"),
    }
}

/// Collect, resolve, and apply: the whole collection pass.
///
/// Cache files requested but missing are written once the pass completes.
///
/// # Errors
///
/// Same as [`run`].
pub async fn execute(
    settings: &Settings,
    ctx: &ServiceContext,
    args: &CollectArgs,
) -> Result<CollectionReport> {
    let fs = ctx.fs.as_ref();
    let manifest = CollectionManifest::load(fs, &args.manifest)?;
    let collection =
        Collector::new(settings.collector.exclude_prefixes.clone()).collect(&manifest)?;
    info!(
        items = collection.items.len(),
        issues = collection.index.len(),
        "Collected issue references"
    );

    let server_version = settings.server_version();
    let plan = CachePlan::new(fs, &args.cache.cache_dir, args.cache.requested());
    let cached = plan.load(fs, &server_version)?;

    let mut issues = IssueContext::new(server_version, settings.retry_policy(), collection.index)
        .with_cache(cached);
    issues.resolve(ctx).await?;

    let filters = TrackerFilters::new(args.bz.clone(), args.jr.clone());
    let report = apply(&mut issues, ctx, &collection.items, &filters).await?;

    if !plan.is_empty() {
        let meta = RunMeta::capture(
            ctx.clock.as_ref(),
            issues.server_version().to_string(),
            settings.server.hostname.clone(),
        );
        plan.store(fs, issues.index(), &meta)?;
    }
    Ok(report)
}
