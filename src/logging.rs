//! Tracing setup shared by the binaries.
//!
//! Logs go to stderr so the streamed research output on stdout stays clean.
//! `RUST_LOG` wins over the level passed in.

use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::error::{ResearchError, Result};

/// Install the global subscriber: DEBUG when `verbose`, INFO otherwise.
pub fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    init_logging_with_level(level)
}

/// Install the global subscriber with `level` as the default filter.
///
/// The tutorial exercises use `Level::WARN` so their printed walkthrough
/// isn't interleaved with node logs.
pub fn init_logging_with_level(level: Level) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ResearchError::Config(format!("Failed to set logging subscriber: {}", e)))
}
