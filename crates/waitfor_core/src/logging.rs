//! Structured logging setup.
//!
//! Log records go to stderr so that waiting messages and reports printed on
//! stdout stay machine-readable. Optionally a daily rotating log file is
//! written as well. The filter can be overridden via WAITFOR_LOG or RUST_LOG.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory for log files; `None` logs to stderr only
    pub log_dir: Option<PathBuf>,
    /// Whether stderr is a terminal (enables ANSI colors)
    pub is_pty: bool,
    /// Optional custom log filter
    pub log_filter: Option<String>,
    /// Raise the default level to debug
    pub verbose: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            is_pty: atty::is(atty::Stream::Stderr),
            log_filter: None,
            verbose: false,
        }
    }
}

impl LogConfig {
    /// Also write log files into `log_dir`.
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    /// Set custom log filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    /// Use the verbose default filter.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Guard that must be held for the lifetime of the application.
///
/// Dropping this guard flushes pending log entries.
pub struct LoggingGuard {
    _worker_guard: Option<WorkerGuard>,
}

/// Initialize logging with the given configuration.
///
/// If the log directory cannot be used, falls back to stderr only.
pub fn init_logging(config: LogConfig) -> LoggingGuard {
    let Some(log_dir) = config.log_dir.as_deref() else {
        return init_stderr_logging(&config);
    };

    match init_file_logging(&config, log_dir) {
        Ok(guard) => LoggingGuard { _worker_guard: Some(guard) },
        Err(e) => {
            eprintln!("Warning: Failed to initialize file logging: {}. Using stderr only.", e);
            init_stderr_logging(&config)
        }
    }
}

fn init_stderr_logging(config: &LogConfig) -> LoggingGuard {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(build_env_filter(config.log_filter.as_deref(), config.verbose))
        .with_ansi(config.is_pty)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    LoggingGuard { _worker_guard: None }
}

/// Initialize file + stderr logging.
fn init_file_logging(
    config: &LogConfig,
    log_dir: &Path,
) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    let file_appender = file_appender(log_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the terminal at INFO and above; the file gets whatever the filter allows.
    let stderr = std::io::stderr.with_max_level(tracing::Level::INFO);
    let combined = stderr.and(non_blocking);

    tracing_subscriber::fmt()
        .with_writer(combined)
        .with_env_filter(build_env_filter(config.log_filter.as_deref(), config.verbose))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    Ok(guard)
}

/// Create the daily rotating appender, creating the directory if needed.
fn file_appender(log_dir: &Path) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(log_dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("waitfor")
        .filename_suffix("log")
        .build(log_dir)?;
    Ok(appender)
}

/// Build the environment filter.
///
/// Priority: custom filter > WAITFOR_LOG > RUST_LOG > default.
fn build_env_filter(custom_filter: Option<&str>, verbose: bool) -> EnvFilter {
    if let Some(filter) = custom_filter {
        return EnvFilter::try_new(filter)
            .unwrap_or_else(|_| EnvFilter::new(default_log_filter(verbose)));
    }

    EnvFilter::try_from_env("WAITFOR_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter(verbose)))
}

/// Get the default log filter.
pub fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "info,waitfor=debug,waitfor_core=debug,tokio_postgres=info"
    } else {
        "warn,tokio_postgres=error"
    }
}

/// Get the default log directory.
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("waitfor")
        .join("logs")
}
