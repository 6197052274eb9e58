/// Logging setup for focus-insights
///
/// Everything goes to a daily log file under the state directory, so the
/// CLI output stays readable.

use crate::config::{Config, LoggingConfig};
use crate::error::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Base name of the log file (the appender adds the date)
const LOG_FILE: &str = "focus-insights.log";

/// Hold on to this for as long as the program runs
///
/// Log lines are written by a background worker. Dropping the guard flushes
/// whatever it still has queued.
pub struct LoggingGuard {
    _worker: WorkerGuard,
}

/// Set up file logging
///
/// # Arguments
/// * `config` - Logging section of the config; `RUST_LOG` overrides its level
///
/// # Returns
/// * `Ok(LoggingGuard)` - Keep it alive until exit
/// * `Err(InsightError)` - If the log directory can't be created
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_dir = Config::state_dir();

    // Create log directory if it doesn't exist
    std::fs::create_dir_all(&log_dir)?;

    let appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE);
    let (writer, worker) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(level_filter(&config.level))
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!(dir = %log_dir.display(), level = %config.level, "logging started");

    Ok(LoggingGuard { _worker: worker })
}

/// Route logs into the test harness output
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level_filter("info"))
        .with_test_writer()
        .try_init();
}

// RUST_LOG if set, otherwise the configured level
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Where log files are written, for display
pub fn log_file_path() -> PathBuf {
    Config::log_path()
}
