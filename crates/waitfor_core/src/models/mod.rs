//! Data models for waitfor.
//!
//! - `target` - TcpTarget, PostgresTarget
//! - `policy` - WaitPolicy, RetryEvent, WaitReport

pub mod policy;
pub mod target;

pub use policy::{RetryEvent, WaitPolicy, WaitReport, DEFAULT_INTERVAL};
pub use target::{PostgresTarget, TcpTarget, DEFAULT_PG_PORT};
