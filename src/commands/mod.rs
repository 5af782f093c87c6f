//! Command dispatch and handlers.

pub mod check;
pub mod collect;

use std::future::Future;

use crate::adapters::live::LiveFileSystem;
use crate::cli::{Cli, Command};
use crate::config::Settings;
use crate::context::ServiceContext;

/// Dispatch a parsed command to its handler.
///
/// Settings are loaded first; the live service context is built from them.
///
/// # Errors
///
/// Returns an error string if settings cannot be loaded or the selected
/// command handler fails.
pub fn dispatch(cli: &Cli) -> Result<(), String> {
    let settings =
        Settings::load(&LiveFileSystem, cli.config.as_deref()).map_err(|e| e.to_string())?;
    let ctx = ServiceContext::live(&settings);
    dispatch_with_context(&cli.command, &settings, &ctx)
}

/// Dispatch a command with the given settings and service context.
///
/// # Errors
///
/// Returns an error string if the command handler fails.
pub fn dispatch_with_context(
    command: &Command,
    settings: &Settings,
    ctx: &ServiceContext,
) -> Result<(), String> {
    let output = match command {
        Command::Collect(args) => block_on(collect::run(settings, ctx, args))?,
        Command::Check(args) => block_on(check::run(settings, ctx, args))?,
    };
    print!("{}", output.map_err(|e| e.to_string())?);
    Ok(())
}

/// Drives `future` to completion on a single-threaded runtime.
fn block_on<F: Future>(future: F) -> Result<F::Output, String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start async runtime: {e}"))?;
    Ok(runtime.block_on(future))
}
