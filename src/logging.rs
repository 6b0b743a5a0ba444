//! Structured logging to a rolling file.
//!
//! The terminal belongs to the TUI and to command output, so log lines go to
//! `<data dir>/logs/lumina.log.<date>`. The filter is read from `LUMINA_LOG`.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Install the global subscriber. Keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn init(log_dir: &Path) -> Result<WorkerGuard> {
  std::fs::create_dir_all(log_dir)
    .map_err(|e| Error::Config(format!("Failed to create log directory: {}", e)))?;

  let appender = tracing_appender::rolling::daily(log_dir, "lumina.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env("LUMINA_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .with_target(true)
    .try_init()
    .map_err(|e| Error::Config(format!("Failed to initialise logging: {}", e)))?;

  Ok(guard)
}
