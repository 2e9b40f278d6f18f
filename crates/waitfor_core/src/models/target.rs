//! Probe target models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default PostgreSQL port.
pub const DEFAULT_PG_PORT: u16 = 5432;

/// A TCP endpoint to wait for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpTarget {
    /// Host name or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl TcpTarget {
    /// Create a new TCP target.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for TcpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bare IPv6 literals need brackets to stay unambiguous.
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// A PostgreSQL server to wait for.
///
/// `Debug` and `Display` never include the password.
#[derive(Clone, Serialize, Deserialize)]
pub struct PostgresTarget {
    /// Server hostname
    pub host: String,
    /// Server port (default 5432)
    pub port: u16,
    /// Username
    pub user: String,
    /// Password, if the server requires one
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Database to connect to; defaults to the user name
    pub database: Option<String>,
    /// Connection timeout for one attempt
    pub connect_timeout: Duration,
}

impl PostgresTarget {
    /// Create a new target with default port and no password.
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PG_PORT,
            user: user.into(),
            password: None,
            database: None,
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the per-attempt connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Database that will actually be used (libpq falls back to the user name).
    pub fn effective_database(&self) -> &str {
        self.database.as_deref().unwrap_or(&self.user)
    }

    /// Build a tokio-postgres config for this target.
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config.host(&self.host);
        pg_config.port(self.port);
        pg_config.user(&self.user);
        pg_config.dbname(self.effective_database());
        if let Some(password) = &self.password {
            pg_config.password(password);
        }
        pg_config.application_name("waitfor");
        pg_config.connect_timeout(self.connect_timeout);
        pg_config
    }
}

impl fmt::Debug for PostgresTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl fmt::Display for PostgresTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "postgres://{}@{}/{}",
            self.user,
            TcpTarget::new(self.host.clone(), self.port),
            self.effective_database()
        )
    }
}
