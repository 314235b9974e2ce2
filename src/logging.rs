//! Application logging facade.
//!
//! Thin wrapper over `tracing` so call sites stay terse and the subscriber
//! is configured in exactly one place. By default records go to a log file
//! under the user's data directory; `--verbose` switches to stderr so a
//! debugging session sees everything live.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Environment variable consulted for the log filter, `RUST_LOG` style.
pub const LOG_FILTER_ENV: &str = "DEEPRESEARCH_LOG";

/// Default log file location, under the platform data directory.
#[must_use]
pub fn default_log_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("deepresearch")
        .join("deepresearch.log")
}

/// Install the global subscriber. Call once, early in `main`.
///
/// Repeated initialization (e.g. from tests) is tolerated: the first
/// subscriber wins and later calls are no-ops.
pub fn init(log_path: Option<&Path>, verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    if verbose {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
        return Ok(());
    }

    let path = log_path.map(Path::to_path_buf).unwrap_or_else(default_log_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init();
    Ok(())
}

pub fn info(message: impl AsRef<str>) {
    tracing::info!("{}", message.as_ref());
}

pub fn warn(message: impl AsRef<str>) {
    tracing::warn!("{}", message.as_ref());
}

pub fn error(message: impl AsRef<str>) {
    tracing::error!("{}", message.as_ref());
}

pub fn debug(message: impl AsRef<str>) {
    tracing::debug!("{}", message.as_ref());
}
