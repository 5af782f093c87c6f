//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::issue::{IssueRef, TrackerKind};

/// Top-level CLI parser for `issuegate`.
#[derive(Debug, Parser)]
#[command(
    name = "issuegate",
    version,
    about = "Skip and deselect tests based on Bugzilla and Jira issue state"
)]
pub struct Cli {
    /// Settings file (YAML). Defaults to `$ISSUEGATE_CONFIG` or `./issuegate.yaml`.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect issue references from a test manifest and decide each item's fate.
    Collect(CollectArgs),
    /// Report whether the given issues are open or obsolete.
    Check(CheckArgs),
}

/// Cache flags shared by all commands.
#[derive(Debug, Clone, Args)]
pub struct CacheArgs {
    /// Use (or create) the Bugzilla cache file.
    #[arg(long)]
    pub bz_cache: bool,

    /// Use (or create) the Jira cache file.
    #[arg(long)]
    pub jr_cache: bool,

    /// Directory holding `bz_cache.json` and `jr_cache.json`.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub cache_dir: PathBuf,
}

impl CacheArgs {
    /// Trackers whose cache file was requested.
    #[must_use]
    pub fn requested(&self) -> Vec<TrackerKind> {
        let mut kinds = Vec::new();
        if self.bz_cache {
            kinds.push(TrackerKind::Bugzilla);
        }
        if self.jr_cache {
            kinds.push(TrackerKind::Jira);
        }
        kinds
    }
}

/// Arguments of `issuegate collect`.
#[derive(Debug, Clone, Args)]
pub struct CollectArgs {
    /// Collection manifest exported by the test runner (JSON or YAML).
    #[arg(long, value_name = "PATH")]
    pub manifest: PathBuf,

    /// Only select items referring to one of these Bugzilla ids.
    #[arg(long = "BZ", value_name = "IDS", value_delimiter = ',')]
    pub bz: Option<Vec<String>>,

    /// Only select items referring to one of these Jira keys.
    #[arg(long = "JR", value_name = "KEYS", value_delimiter = ',')]
    pub jr: Option<Vec<String>>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub cache: CacheArgs,
}

/// Arguments of `issuegate check`.
#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Issue references such as `BZ:1625783` or `JR:SAT-12345`.
    #[arg(required = true, value_name = "REF")]
    pub issues: Vec<IssueRef>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub cache: CacheArgs,
}

/// Output formats for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, OutputFormat};
    use crate::issue::{IssueRef, TrackerKind};
    use clap::Parser;

    #[test]
    fn parses_collect_with_filters() {
        let cli = Cli::parse_from([
            "issuegate",
            "collect",
            "--manifest",
            "m.json",
            "--BZ",
            "123456,7",
            "--jr-cache",
            "--format",
            "json",
        ]);
        let Command::Collect(args) = cli.command else { panic!("expected collect") };
        assert_eq!(args.bz, Some(vec!["123456".to_string(), "7".to_string()]));
        assert_eq!(args.jr, None);
        assert_eq!(args.cache.requested(), vec![TrackerKind::Jira]);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn parses_check_refs() {
        let cli = Cli::parse_from(["issuegate", "--config", "c.yaml", "check", "BZ:1", "JR:SAT-2"]);
        let Command::Check(args) = cli.command else { panic!("expected check") };
        assert_eq!(
            args.issues,
            vec![IssueRef::new(TrackerKind::Bugzilla, "1"), "JR:SAT-2".parse().unwrap()]
        );
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("c.yaml")));
    }

    #[test]
    fn check_rejects_bad_refs_and_empty_lists() {
        assert!(Cli::try_parse_from(["issuegate", "check", "GH:1"]).is_err());
        assert!(Cli::try_parse_from(["issuegate", "check"]).is_err());
    }

    #[test]
    fn collect_requires_manifest() {
        assert!(Cli::try_parse_from(["issuegate", "collect"]).is_err());
    }
}
