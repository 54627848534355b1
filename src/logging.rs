// File-backed structured logging.
// - The terminal belongs to the UI, so events go to a daily rolling file.
// - `RUST_LOG` overrides the default filter.
use std::{fs, io, path::Path};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,altmp=debug";
const LOG_FILE_PREFIX: &str = "altmp.log";

/// Keep the returned guard alive for the whole run; dropping it flushes.
pub fn init_logging(log_dir: &Path) -> io::Result<WorkerGuard> {
    fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .try_init()
        .map_err(|err| io::Error::other(format!("failed to install logger: {err}")))?;

    Ok(guard)
}
