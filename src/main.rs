//! Binary entrypoint for the `issuegate` CLI.

use std::env;
use std::process::ExitCode;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    match issuegate::run(env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so reports on stdout stay machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("ISSUEGATE_LOG")
        .unwrap_or_else(|_| EnvFilter::new("issuegate=info,warn"));

    let format = env::var("ISSUEGATE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr)).init();
        }
        _ => {
            registry.with(fmt::layer().compact().with_writer(std::io::stderr)).init();
        }
    }
}
