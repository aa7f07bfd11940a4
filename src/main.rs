use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use primtime::cli::{Cli, OutputFormat};
use primtime::report::{JsonReporter, Reporter, TextReporter};
use primtime::suite;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber on stderr
///
/// Warnings (resource failures, cleanup failures) are always shown;
/// `--debug` adds per-block detail.
fn init_tracing(debug: bool) {
    let level = if debug {
        tracing::Level::TRACE
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = args
        .suite_config()
        .context("Failed to load suite configuration")?;

    let stdout = io::stdout().lock();
    let mut reporter: Box<dyn Reporter> = match args.format {
        OutputFormat::Text => Box::new(TextReporter::new(stdout)),
        OutputFormat::Json => Box::new(JsonReporter::new(stdout)),
    };

    suite::run(&config, reporter.as_mut()).context("Benchmark run failed")?;
    Ok(())
}
