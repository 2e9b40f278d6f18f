//! Probe services for waitfor.
//!
//! - `probe` - The single-attempt `Probe` trait
//! - `tcp` - TCP port readiness
//! - `postgres` - PostgreSQL readiness via tokio-postgres
//! - `waiter` - Fixed-interval retry loop
//! - `ports` - Local free-port helpers

pub mod ports;
pub mod postgres;
pub mod probe;
pub mod tcp;
pub mod waiter;

pub use ports::{check_port_free, find_port};
pub use postgres::PostgresProbe;
pub use probe::Probe;
pub use tcp::TcpProbe;
pub use waiter::Waiter;
