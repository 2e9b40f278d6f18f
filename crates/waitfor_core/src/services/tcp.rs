//! TCP port readiness probe.

use crate::error::WaitError;
use crate::models::TcpTarget;
use crate::services::Probe;

use std::net::SocketAddr;
use tokio::net::TcpStream;

/// Checks that a TCP connection to a host and port can be opened.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    target: TcpTarget,
}

impl TcpProbe {
    /// Create a probe for the given target.
    pub fn new(target: TcpTarget) -> Self {
        Self { target }
    }

    /// Get the probed target.
    pub fn tcp_target(&self) -> &TcpTarget {
        &self.target
    }

    async fn resolve(&self) -> Result<Vec<SocketAddr>, WaitError> {
        let host = self.target.host.trim_start_matches('[').trim_end_matches(']');
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, self.target.port))
            .await
            .map_err(|e| WaitError::resolve(format!("{host}: {e}")))?
            .collect();
        if addrs.is_empty() {
            return Err(WaitError::resolve(format!("{host}: no addresses found")));
        }
        Ok(addrs)
    }
}

impl Probe for TcpProbe {
    fn target(&self) -> String {
        self.target.to_string()
    }

    async fn probe(&self) -> Result<(), WaitError> {
        let addrs = self.resolve().await?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    tracing::debug!(target_addr = %addr, "TCP connection established");
                    drop(stream);
                    return Ok(());
                }
                Err(e) => {
                    tracing::trace!(target_addr = %addr, error = %e, "TCP connect failed");
                    last_error = Some(WaitError::connection_with_source(
                        format!("{addr}: {e}"),
                        e,
                    ));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| WaitError::connection("no address to connect to")))
    }
}
