//! Tracing setup. Logs go to a file so command output on stdout stays clean.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_ENV: &str = "FOLIO_LOG";
const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// for the whole run. With `verbose`, records are mirrored to stderr.
pub fn init(verbose: bool) -> Result<WorkerGuard> {
  let log_dir = log_dir()?;
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let file_appender = tracing_appender::rolling::never(&log_dir, "folio.log");
  let (writer, guard) = tracing_appender::non_blocking(file_appender);

  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

  let file_layer = fmt::layer()
    .with_ansi(false)
    .with_target(true)
    .with_writer(writer);

  let stderr_layer = verbose.then(|| {
    fmt::layer()
      .with_target(false)
      .with_writer(std::io::stderr)
  });

  tracing_subscriber::registry()
    .with(filter)
    .with(file_layer)
    .with(stderr_layer)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}

fn log_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("folio"))
}
