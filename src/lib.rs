//! Core library entry for the `issuegate` CLI.
//!
//! A collection pass runs in three stages: [`collect`] finds issue
//! references on test items, [`resolve`] fills in tracker data and decides
//! which issues are open, and [`apply`] turns that into skips and
//! deselections.

pub mod adapters;
pub mod apply;
pub mod cache;
pub mod cli;
pub mod collect;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod issue;
pub mod ports;
pub mod resolve;
pub mod version;

pub use error::{Error, Result};

use clap::error::ErrorKind;
use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// Help and version requests print to stdout and succeed.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> std::result::Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if is_informational(err.kind()) => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };
    commands::dispatch(&cli)
}

fn is_informational(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}
