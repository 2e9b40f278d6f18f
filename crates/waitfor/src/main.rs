//! waitfor - block until a TCP port or PostgreSQL server is ready.

mod args;

use args::{Args, Command};
use clap::Parser;
use std::process::ExitCode;
use tokio::task::JoinHandle;
use waitfor_core::logging::init_logging;
use waitfor_core::{
    check_port_free, find_port, CancellationToken, PostgresProbe, PostgresTarget, Probe,
    TcpProbe, TcpTarget, WaitError, WaitPolicy, WaitReport, Waiter,
};

/// Exit code when waiting was interrupted with Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

/// Exit code for invalid settings, same as clap's usage errors.
const EXIT_USAGE: u8 = 2;

/// How waiting results are printed.
struct Output {
    quiet: bool,
    json: bool,
}

impl Output {
    /// Line to print on stdout once the target is ready, if any.
    fn report_line(&self, report: &WaitReport) -> Option<String> {
        if !self.json {
            return None;
        }
        match serde_json::to_string(report) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize report");
                None
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let _logging_guard = init_logging(args.log_config());

    let policy = args.policy();
    let output = Output { quiet: args.quiet, json: args.json };

    match args.command {
        Command::Port { host, port } => {
            let probe = TcpProbe::new(TcpTarget::new(host, port));
            ExitCode::from(run_wait(probe, policy, &output).await)
        }
        Command::Postgres { host, port, user, password, database } => {
            let mut target = PostgresTarget::new(host, user)
                .with_port(port)
                .with_connect_timeout(policy.effective_attempt_timeout());
            target.password = password;
            target.database = database;
            ExitCode::from(run_wait(PostgresProbe::new(target), policy, &output).await)
        }
        Command::FreePort { attempts } => match find_port(attempts).await {
            Ok(port) => {
                println!("{port}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                report_error(&e);
                ExitCode::FAILURE
            }
        },
        Command::CheckPort { port } => match check_port_free(port).await {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => {
                tracing::info!(port, "Port is taken");
                ExitCode::FAILURE
            }
            Err(e) => {
                report_error(&e);
                ExitCode::FAILURE
            }
        },
    }
}

/// Wait for `probe` and translate the outcome into an exit code.
async fn run_wait<P: Probe>(probe: P, policy: WaitPolicy, output: &Output) -> u8 {
    let cancel = CancellationToken::new();
    let ctrl_c = spawn_ctrl_c_listener(cancel.clone());

    let waiter = Waiter::new(probe, policy);
    let result = waiter
        .wait(
            |event| {
                if output.quiet {
                    return;
                }
                // Keep stdout parseable when a JSON report was requested.
                if output.json {
                    eprintln!("{}", event.message());
                } else {
                    println!("{}", event.message());
                }
            },
            &cancel,
        )
        .await;
    ctrl_c.abort();

    match result {
        Ok(report) => {
            if let Some(line) = output.report_line(&report) {
                println!("{line}");
            }
            0
        }
        Err(e) => {
            report_error(&e);
            exit_code(&e)
        }
    }
}

/// Cancel `cancel` on Ctrl-C. Abort the handle once waiting is over.
fn spawn_ctrl_c_listener(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    })
}

/// Map a wait failure to a process exit code.
fn exit_code(error: &WaitError) -> u8 {
    match error {
        WaitError::Cancelled { .. } => EXIT_CANCELLED,
        WaitError::Config { .. } => EXIT_USAGE,
        _ => 1,
    }
}

fn report_error(error: &WaitError) {
    tracing::error!(category = error.category(), error = %error, "waitfor failed");
    eprintln!("Error: {error}");
    if let Some(hint) = error.hint() {
        eprintln!("Hint: {hint}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&WaitError::cancelled("localhost:80")), 130);
        assert_eq!(exit_code(&WaitError::config("interval must be greater than zero")), 2);
        assert_eq!(
            exit_code(&WaitError::timeout("localhost:80", Duration::from_secs(3), 3)),
            1
        );
        assert_eq!(
            exit_code(&WaitError::exhausted("localhost:80", 2, WaitError::connection("refused"))),
            1
        );
    }

    #[tokio::test]
    async fn test_run_wait_ready_port_succeeds() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let output = Output { quiet: true, json: false };

        let code = run_wait(
            TcpProbe::new(TcpTarget::new("127.0.0.1", port)),
            WaitPolicy::default(),
            &output,
        )
        .await;
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_run_wait_gives_up_with_failure() {
        let port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let output = Output { quiet: true, json: false };
        let policy = WaitPolicy::default()
            .with_interval(Duration::from_millis(10))
            .with_max_attempts(2);

        let code =
            run_wait(TcpProbe::new(TcpTarget::new("127.0.0.1", port)), policy, &output).await;
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn test_run_wait_json_report() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let output = Output { quiet: true, json: true };

        let code = run_wait(
            TcpProbe::new(TcpTarget::new("127.0.0.1", port)),
            WaitPolicy::default(),
            &output,
        )
        .await;
        assert_eq!(code, 0);
    }

    #[test]
    fn test_report_line_only_with_json() {
        let report = WaitReport {
            target: "db:5432".to_string(),
            attempts: 3,
            elapsed: Duration::from_millis(2100),
            started_at: chrono::Utc::now(),
        };

        let plain = Output { quiet: false, json: false };
        assert_eq!(plain.report_line(&report), None);

        let json = Output { quiet: false, json: true };
        let line = json.report_line(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["target"], "db:5432");
        assert_eq!(value["attempts"], 3);
        assert_eq!(value["elapsed"], 2100);
        assert!(value["started_at"].is_string());
    }

    #[tokio::test]
    async fn test_ctrl_c_listener_stops_when_aborted() {
        let cancel = CancellationToken::new();
        let handle = spawn_ctrl_c_listener(cancel.clone());
        handle.abort();

        let err = handle.await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(!cancel.is_cancelled());
    }
}
