//! Local port helpers.

use crate::error::WaitError;

use rand::Rng;
use std::future::Future;
use std::io::ErrorKind;
use std::net::Ipv4Addr;
use tokio::net::TcpStream;

/// Default number of random picks made by [`find_port`].
pub const DEFAULT_FIND_ATTEMPTS: u32 = 100;

/// Lowest port [`find_port`] picks from.
pub const MIN_PORT: u16 = 1024;

/// Highest port [`find_port`] picks from.
pub const MAX_PORT: u16 = 32768;

/// Check whether nothing is listening on `127.0.0.1:port`.
///
/// A refused connection means the port is free; a successful one means it is
/// taken. Any other failure is returned as an error.
pub async fn check_port_free(port: u16) -> Result<bool, WaitError> {
    match TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await {
        Ok(_) => Ok(false),
        Err(e) if e.kind() == ErrorKind::ConnectionRefused => Ok(true),
        Err(e) => Err(WaitError::from(e)),
    }
}

/// Find a free port on localhost by random search.
///
/// A port check that fails for any reason other than a refused connection
/// aborts the search with that error.
pub async fn find_port(attempts: u32) -> Result<u16, WaitError> {
    search_free_port(attempts, check_port_free).await
}

async fn search_free_port<F, Fut>(attempts: u32, mut is_free: F) -> Result<u16, WaitError>
where
    F: FnMut(u16) -> Fut,
    Fut: Future<Output = Result<bool, WaitError>>,
{
    for attempt in 1..=attempts {
        let port = rand::thread_rng().gen_range(MIN_PORT..=MAX_PORT);
        if is_free(port).await? {
            tracing::debug!(port, attempt, "Found free port");
            return Ok(port);
        }
        tracing::trace!(port, "Port is taken");
    }
    Err(WaitError::NoFreePort { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_listening_port_is_not_free() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(!check_port_free(port).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_port_in_range() {
        let port = find_port(DEFAULT_FIND_ATTEMPTS).await.unwrap();
        assert!((MIN_PORT..=MAX_PORT).contains(&port));
        assert!(check_port_free(port).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_port_zero_attempts() {
        let err = find_port(0).await.unwrap_err();
        assert!(matches!(err, WaitError::NoFreePort { attempts: 0 }));
    }

    #[tokio::test]
    async fn test_search_stops_on_check_error() {
        let mut checks = 0;
        let err = search_free_port(10, |_| {
            checks += 1;
            async { Err(WaitError::connection("network unreachable")) }
        })
        .await
        .unwrap_err();

        assert_eq!(checks, 1);
        assert_eq!(err.to_string(), "Connection error: network unreachable");
    }

    #[tokio::test]
    async fn test_search_gives_up_when_every_port_is_taken() {
        let mut checks = 0;
        let err = search_free_port(5, |_| {
            checks += 1;
            async { Ok(false) }
        })
        .await
        .unwrap_err();

        assert_eq!(checks, 5);
        assert!(matches!(err, WaitError::NoFreePort { attempts: 5 }));
    }
}
