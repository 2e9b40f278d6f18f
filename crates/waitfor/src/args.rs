use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use waitfor_core::logging::{default_log_dir, LogConfig};
use waitfor_core::models::{DEFAULT_PG_PORT, WaitPolicy};
use waitfor_core::services::ports::DEFAULT_FIND_ATTEMPTS;

/// Block until a TCP port or PostgreSQL server is ready
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Seconds to sleep between attempts
    #[arg(long, global = true, env = "WAITFOR_INTERVAL", default_value = "1", value_parser = parse_seconds)]
    pub interval: Duration,

    /// Give up after this many attempts
    #[arg(long, global = true, env = "WAITFOR_MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,

    /// Give up after this many seconds
    #[arg(long, global = true, env = "WAITFOR_TIMEOUT", value_parser = parse_seconds)]
    pub timeout: Option<Duration>,

    /// Seconds allowed for a single attempt (defaults to the interval)
    #[arg(long, global = true, env = "WAITFOR_ATTEMPT_TIMEOUT", value_parser = parse_seconds)]
    pub attempt_timeout: Option<Duration>,

    /// Do not print a message for each failed attempt
    #[arg(short, long, global = true, action)]
    pub quiet: bool,

    /// Print a JSON report once the target is ready
    #[arg(long, global = true, action)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true, action)]
    pub verbose: bool,

    /// Also write log files to the default log directory
    #[arg(long, global = true, action)]
    pub log_to_file: bool,

    /// Write log files to this directory
    #[arg(long, global = true, env = "WAITFOR_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wait until a TCP port accepts connections
    Port {
        /// Host name or IP address
        host: String,
        /// TCP port
        port: u16,
    },
    /// Wait until a PostgreSQL server answers a query
    Postgres {
        /// Server hostname
        host: String,
        /// Server port
        #[arg(default_value_t = DEFAULT_PG_PORT)]
        port: u16,
        /// Username
        #[arg(default_value = "postgres")]
        user: String,
        /// Password; prefer PGPASSWORD to keep it out of shell history
        #[arg(env = "PGPASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Database name (defaults to the user name)
        #[arg(short, long, env = "PGDATABASE")]
        database: Option<String>,
    },
    /// Print a free port on localhost
    FreePort {
        /// Random picks before giving up
        #[arg(long, default_value_t = DEFAULT_FIND_ATTEMPTS)]
        attempts: u32,
    },
    /// Exit with 0 if nothing listens on the local port, 1 otherwise
    CheckPort {
        /// TCP port
        port: u16,
    },
}

impl Args {
    /// Retry policy from the command line.
    pub fn policy(&self) -> WaitPolicy {
        let mut policy = WaitPolicy::default().with_interval(self.interval);
        policy.attempt_timeout = self.attempt_timeout;
        policy.max_attempts = self.max_attempts;
        policy.timeout = self.timeout;
        policy
    }

    /// Logging configuration from the command line.
    pub fn log_config(&self) -> LogConfig {
        let config = LogConfig::default().verbose(self.verbose);
        match (&self.log_dir, self.log_to_file) {
            (Some(dir), _) => config.with_log_dir(dir),
            (None, true) => config.with_log_dir(default_log_dir()),
            (None, false) => config,
        }
    }
}

/// Parse a non-negative number of seconds, fractions allowed.
fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.trim().parse().map_err(|_| format!("'{s}' is not a number of seconds"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("'{s}' must be a non-negative number of seconds"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}
