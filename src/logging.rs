//! Tracing subscriber setup
//!
//! Console output follows `logging.format`; a plain-text copy of every event
//! is appended to `logging.file`.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::error::AppError;

/// Install the global subscriber
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process.
///
/// # Errors
/// Returns error if the log file cannot be opened
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard, AppError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level)));

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender(&config.file)?);

    let json = config.format == "json";

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer().pretty().with_file(false)))
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false),
        )
        .init();

    Ok(guard)
}

/// Append-only writer for `path`, never rotated
fn file_appender(path: &Path) -> Result<RollingFileAppender, AppError> {
    let (directory, file_name) = split_log_path(path);

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy().into_owned())
        .build(directory)
        .map_err(|e| {
            AppError::Config(format!("cannot open log file {}: {e}", path.display()))
        })
}

fn default_directive(level: &str) -> String {
    format!("unfollower={level},warn")
}

fn split_log_path(path: &Path) -> (&Path, &std::ffi::OsStr) {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("github_unfollow.log"));
    (directory, file_name)
}
