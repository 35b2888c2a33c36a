use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "cf_receiver.log";
const DEFAULT_DIRECTIVE: &str = "cf_receiver=info";

/// Initializes the logging system with both console and file output.
///
/// The returned guard flushes the file writer when dropped; keep it alive for
/// the life of the process. Falls back to console-only output when the log
/// directory cannot be created.
pub fn init_logging() -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    // Daily-rolling JSON file
    let (file_layer, guard, dir_error) = match fs::create_dir_all(LOG_DIR) {
        Ok(()) => {
            let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
            let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer().json().with_writer(non_blocking_writer);
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(fmt::layer().with_writer(std::io::stdout))
        .init();

    if let Some(e) = dir_error {
        tracing::warn!(error = %e, dir = LOG_DIR, "file logging disabled");
    }
    guard
}
