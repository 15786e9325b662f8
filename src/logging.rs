//! Logging setup
//!
//! Two outputs share one subscriber: the console shows events at the level
//! picked on the command line (or `RUST_LOG`), while the log file under the
//! application directory always records debug detail, appended across runs.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{Directive, EnvFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::errors::{ConfigError, ConfigResult};

/// Target of every event emitted by this crate
const CRATE_TARGET: &str = "rustmaps";

/// Keeps the file writer alive; dropping it flushes the log file
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

fn directive(level: &str) -> ConfigResult<Directive> {
    format!("{}={}", CRATE_TARGET, level)
        .parse()
        .map_err(|e: tracing_subscriber::filter::ParseError| ConfigError::Logging {
            reason: e.to_string(),
        })
}

/// Console filter: `RUST_LOG` plus the crate at `level`
pub fn console_filter(level: &str) -> ConfigResult<EnvFilter> {
    Ok(EnvFilter::from_default_env().add_directive(directive(level)?))
}

/// File filter: the crate at debug regardless of the console level
pub fn file_filter() -> ConfigResult<EnvFilter> {
    Ok(EnvFilter::new("warn").add_directive(directive("debug")?))
}

/// Install the global subscriber
///
/// # Errors
///
/// Returns `ConfigError` if the log directory cannot be created or a
/// subscriber is already installed
pub fn init_logging(level: &str, log_file: &Path) -> ConfigResult<LoggingGuard> {
    let log_dir = log_file.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(log_dir).map_err(|source| ConfigError::Io {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let file_name = log_file
        .file_name()
        .ok_or_else(|| ConfigError::Logging {
            reason: format!("{} is not a file path", log_file.display()),
        })?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(file_filter()?);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter(level)?);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| ConfigError::Logging {
            reason: e.to_string(),
        })?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
