//! PostgreSQL readiness probe.
//!
//! One attempt opens a fresh connection, runs `SELECT 1` and closes it. No
//! pooling: the connection only lives for the duration of the attempt.

use crate::error::WaitError;
use crate::models::PostgresTarget;
use crate::services::Probe;

use tokio::task::JoinHandle;
use tokio_postgres::NoTls;

/// Query run against the server once connected.
pub const PROBE_QUERY: &str = "SELECT 1";

/// Checks that a PostgreSQL server accepts the given credentials and answers
/// a trivial query.
#[derive(Clone)]
pub struct PostgresProbe {
    target: PostgresTarget,
    pg_config: tokio_postgres::Config,
}

impl PostgresProbe {
    /// Create a probe for the given target.
    pub fn new(target: PostgresTarget) -> Self {
        let pg_config = target.to_pg_config();
        Self { target, pg_config }
    }

    /// Get the probed target.
    pub fn postgres_target(&self) -> &PostgresTarget {
        &self.target
    }
}

impl std::fmt::Debug for PostgresProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresProbe").field("target", &self.target).finish_non_exhaustive()
    }
}

impl Probe for PostgresProbe {
    fn target(&self) -> String {
        self.target.to_string()
    }

    async fn probe(&self) -> Result<(), WaitError> {
        let (client, connection) = self.pg_config.connect(NoTls).await?;

        // The connection object drives the socket; it finishes once the client drops.
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(error = %e, "Probe connection closed with error");
            }
        });

        let result = client.batch_execute(PROBE_QUERY).await;
        drop(client);
        join_driver(driver).await;
        result?;

        tracing::debug!(
            host = %self.target.host,
            port = self.target.port,
            database = %self.target.effective_database(),
            "PostgreSQL answered probe query"
        );
        Ok(())
    }
}

/// Wait for the connection driver to finish. Returns `false` if the task
/// panicked or was aborted.
async fn join_driver(driver: JoinHandle<()>) -> bool {
    match driver.await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, panicked = e.is_panic(), "Connection driver task failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_without_server_is_connection_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let target = PostgresTarget::new("127.0.0.1", "postgres")
            .with_port(port)
            .with_password("secret")
            .with_connect_timeout(Duration::from_secs(1));
        let probe = PostgresProbe::new(target);

        let err = probe.probe().await.unwrap_err();
        assert_eq!(err.category(), "Connection");
        assert!(!err.to_string().contains("secret"));
    }

    #[tokio::test]
    async fn test_probe_against_non_postgres_listener_fails() {
        // Accepts and immediately hangs up, like a server still starting.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                drop(socket);
            }
        });

        let target = PostgresTarget::new("127.0.0.1", "postgres")
            .with_port(port)
            .with_connect_timeout(Duration::from_secs(1));
        let probe = PostgresProbe::new(target);
        assert!(probe.probe().await.is_err());
    }

    #[tokio::test]
    async fn test_join_driver_reports_failed_task() {
        let finished = tokio::spawn(async {});
        assert!(join_driver(finished).await);

        let panicked = tokio::spawn(async { panic!("driver blew up") });
        assert!(!join_driver(panicked).await);
    }

    #[test]
    fn test_target_display_hides_password() {
        let probe = PostgresProbe::new(
            PostgresTarget::new("db", "lookout").with_password("pw").with_database("models"),
        );
        assert_eq!(probe.target(), "postgres://lookout@db:5432/models");
        assert!(!format!("{probe:?}").contains("\"pw\""));
    }
}
