//! Core types and services for waitfor.
//!
//! This crate provides readiness probes used to sequence service start-up:
//!
//! - **error**: Error handling with PostgreSQL-specific classification
//! - **models**: Probe targets, retry policy and wait reports
//! - **services**: TCP and PostgreSQL probes, the wait loop, port helpers
//! - **logging**: Structured logging setup

pub mod error;
pub mod logging;
pub mod models;
pub mod services;

pub use error::WaitError;
pub use models::{PostgresTarget, RetryEvent, TcpTarget, WaitPolicy, WaitReport};
pub use services::{check_port_free, find_port, PostgresProbe, Probe, TcpProbe, Waiter};
pub use tokio_util::sync::CancellationToken;
