//! Error types for readiness probing.
//!
//! Every probe failure maps to a [`WaitError`]. The wait loop treats all
//! attempt-level failures the same way ("not ready yet"); the categories and
//! hints exist so the waiting messages and logs tell the operator something
//! useful.

use std::time::Duration;
use thiserror::Error;

/// Main error type for waitfor.
#[derive(Debug, Error)]
pub enum WaitError {
    /// TCP connection could not be established.
    #[error("Connection error: {message}")]
    Connection {
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Host name did not resolve to any address.
    #[error("Resolve error: {message}")]
    Resolve {
        /// Human-readable error message.
        message: String,
    },

    /// PostgreSQL rejected the credentials.
    #[error("Authentication error: {message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
        /// Actionable hint for the user.
        hint: Option<String>,
    },

    /// Server answered but the probe query failed.
    #[error("Database error: {message}")]
    Database {
        /// PostgreSQL error message.
        message: String,
        /// PostgreSQL error code (e.g., "57P03").
        code: Option<String>,
    },

    /// A single attempt did not finish in time.
    #[error("Attempt timed out after {}ms", .after.as_millis())]
    AttemptTimeout {
        /// Configured per-attempt limit.
        after: Duration,
    },

    /// The configured number of attempts was used up.
    #[error("{target} not ready after {attempts} attempts")]
    Exhausted {
        /// Display form of the probed target.
        target: String,
        /// Attempts made.
        attempts: u32,
        /// Error from the last attempt.
        #[source]
        last: Box<WaitError>,
    },

    /// The overall deadline passed.
    #[error("{target} not ready after {}s", .elapsed.as_secs())]
    Timeout {
        /// Display form of the probed target.
        target: String,
        /// Time spent waiting.
        elapsed: Duration,
        /// Attempts made.
        attempts: u32,
    },

    /// Waiting was interrupted.
    #[error("Waiting for {target} cancelled")]
    Cancelled {
        /// Display form of the probed target.
        target: String,
    },

    /// No free local port could be found.
    #[error("Cannot find an open port after {attempts} attempts")]
    NoFreePort {
        /// Random picks tried.
        attempts: u32,
    },

    /// Invalid configuration.
    #[error("Config error: {message}")]
    Config {
        /// Human-readable error message.
        message: String,
    },
}

impl WaitError {
    // ========== Constructors ==========

    /// Create a new connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Create a new connection error with source.
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Box::new(source)) }
    }

    /// Create a new resolve error.
    pub fn resolve(message: impl Into<String>) -> Self {
        Self::Resolve { message: message.into() }
    }

    /// Create a new authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            hint: Some("Check username and password".to_string()),
        }
    }

    /// Create an attempt timeout error.
    pub fn attempt_timeout(after: Duration) -> Self {
        Self::AttemptTimeout { after }
    }

    /// Create an exhausted error wrapping the last attempt's failure.
    pub fn exhausted(target: impl Into<String>, attempts: u32, last: WaitError) -> Self {
        Self::Exhausted { target: target.into(), attempts, last: Box::new(last) }
    }

    /// Create an overall timeout error.
    pub fn timeout(target: impl Into<String>, elapsed: Duration, attempts: u32) -> Self {
        Self::Timeout { target: target.into(), elapsed, attempts }
    }

    /// Create a cancellation error.
    pub fn cancelled(target: impl Into<String>) -> Self {
        Self::Cancelled { target: target.into() }
    }

    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    // ========== Methods ==========

    /// Check if this error ended the wait loop rather than a single attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Exhausted { .. } | Self::Timeout { .. } | Self::Cancelled { .. }
        )
    }

    /// Check if waiting was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Get the error category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "Connection",
            Self::Resolve { .. } => "Resolve",
            Self::Authentication { .. } => "Authentication",
            Self::Database { .. } => "Database",
            Self::AttemptTimeout { .. } => "Timeout",
            Self::Exhausted { .. } => "Exhausted",
            Self::Timeout { .. } => "Timeout",
            Self::Cancelled { .. } => "Cancelled",
            Self::NoFreePort { .. } => "Port",
            Self::Config { .. } => "Config",
        }
    }

    /// Get actionable hint for the user.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Connection { .. } => Some("Check that the service is running and listening"),
            Self::Resolve { .. } => Some("Check the host name"),
            Self::Authentication { hint, .. } => hint.as_deref(),
            Self::Database { code, .. } => match code.as_deref() {
                Some("57P03") => Some("The server is still starting up"),
                Some("3D000") => Some("Check the database name"),
                _ => None,
            },
            Self::AttemptTimeout { .. } => Some("The host may be dropping packets"),
            Self::Exhausted { last, .. } => last.hint(),
            Self::Timeout { .. } => Some("Increase --timeout or check the service"),
            Self::Cancelled { .. } => None,
            Self::NoFreePort { .. } => Some("Too many local ports are in use"),
            Self::Config { .. } => None,
        }
    }

    /// Get PostgreSQL error code (if applicable).
    pub fn pg_code(&self) -> Option<&str> {
        match self {
            Self::Database { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

// ========== Error Conversions ==========

/// Convert from tokio_postgres::Error to WaitError.
impl From<tokio_postgres::Error> for WaitError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let message = db_err.message().to_string();
            let code_str = db_err.code().code();
            return match code_str {
                "28P01" => WaitError::Authentication {
                    message,
                    hint: Some("Invalid password - check your credentials".to_string()),
                },
                "28000" => WaitError::Authentication {
                    message,
                    hint: Some(
                        "Authentication failed - check username and permissions".to_string(),
                    ),
                },
                _ if code_str.starts_with("08") => {
                    WaitError::Connection { message, source: Some(Box::new(err)) }
                }
                _ => WaitError::Database { message, code: Some(code_str.to_string()) },
            };
        }

        if err.is_closed() {
            return WaitError::Connection {
                message: "Connection closed".to_string(),
                source: Some(Box::new(err)),
            };
        }

        // tokio-postgres wraps socket failures; surface the io error text.
        let message = match std::error::Error::source(&err) {
            Some(inner) => format!("{err}: {inner}"),
            None => err.to_string(),
        };
        WaitError::Connection { message, source: Some(Box::new(err)) }
    }
}

/// Convert from std::io::Error to WaitError.
impl From<std::io::Error> for WaitError {
    fn from(err: std::io::Error) -> Self {
        WaitError::connection_with_source(err.to_string(), err)
    }
}
