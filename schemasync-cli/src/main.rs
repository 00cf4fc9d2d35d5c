//! schemasync: hold a fleet of ClickHouse replicas to one declared schema.
//!
//! # Usage
//!
//! ```text
//! schemasync [--config <path>] [--sync] [--drop-columns] [--debug] [--json]
//! ```
//!
//! Without `--sync` the run only reports drift. Logs go to stderr, the report
//! to stdout.

mod commands;

use anyhow::{Context, Result};
use clap::Parser;

use commands::check::CheckArgs;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "schemasync",
    version,
    about = "Detect and repair schema drift across ClickHouse replicas",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    check: CheckArgs,

    /// Log at debug level, including every statement sent.
    #[arg(long)]
    debug: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(cli.check.run())
}

/// `--debug` wins over `RUST_LOG`; otherwise `RUST_LOG` or `info`.
fn init_tracing(debug: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if debug {
        EnvFilter::new("info,schemasync_sync=debug,schemasync_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
