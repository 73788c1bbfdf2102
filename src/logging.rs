//! Structured JSON logging to stdout plus daily rolling files.
//!
//! `application.log.<date>` receives every event that passes the filter and
//! `error.log.<date>` only ERROR events. Both writers are non-blocking; keep
//! the returned [`LogGuards`] alive until shutdown or buffered lines are lost.

use std::{fs, path::Path};

use anyhow::{Error, Result, anyhow};
use tracing::Subscriber;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

pub const DEFAULT_LOG_FILTER: &str = "notification_service=info,tower_http=info";

const APPLICATION_LOG: &str = "application.log";
const ERROR_LOG: &str = "error.log";

/// Flush handles for the file writers.
pub struct LogGuards {
    _application: WorkerGuard,
    _errors: WorkerGuard,
}

fn daily_appender(log_dir: &Path, prefix: &str) -> Result<RollingFileAppender, Error> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .build(log_dir)
        .map_err(|e| anyhow!("Failed to open {} in {}: {}", prefix, log_dir.display(), e))
}

pub fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Builds the subscriber without installing it.
pub fn build_subscriber(
    log_dir: &Path,
    filter: EnvFilter,
) -> Result<(impl Subscriber + Send + Sync + 'static, LogGuards), Error> {
    fs::create_dir_all(log_dir)
        .map_err(|e| anyhow!("Failed to create log directory {}: {}", log_dir.display(), e))?;

    let (application_writer, application_guard) =
        tracing_appender::non_blocking(daily_appender(log_dir, APPLICATION_LOG)?);
    let (error_writer, error_guard) =
        tracing_appender::non_blocking(daily_appender(log_dir, ERROR_LOG)?);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json())
        .with(
            fmt::layer()
                .json()
                .with_writer(application_writer)
                .with_ansi(false),
        )
        .with(
            fmt::layer()
                .json()
                .with_writer(error_writer)
                .with_ansi(false)
                .with_filter(LevelFilter::ERROR),
        );

    Ok((
        subscriber,
        LogGuards {
            _application: application_guard,
            _errors: error_guard,
        },
    ))
}

/// Installs the global subscriber.
pub fn init_logging(log_dir: &Path) -> Result<LogGuards, Error> {
    let (subscriber, guards) = build_subscriber(log_dir, default_filter())?;

    subscriber
        .try_init()
        .map_err(|e| anyhow!("Failed to set global default subscriber: {}", e))?;

    Ok(guards)
}
