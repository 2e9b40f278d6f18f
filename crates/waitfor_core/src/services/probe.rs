//! The single-attempt probe abstraction.

use crate::error::WaitError;
use std::future::Future;

/// One readiness check against a dependent service.
///
/// `probe` makes exactly one attempt and reports whether the service is
/// ready. Retrying, pacing and time limits belong to
/// [`Waiter`](crate::services::Waiter).
pub trait Probe {
    /// Display form of what is being probed, used in messages and logs.
    fn target(&self) -> String;

    /// Make one attempt. `Ok(())` means the service is ready.
    fn probe(&self) -> impl Future<Output = Result<(), WaitError>> + Send;
}
