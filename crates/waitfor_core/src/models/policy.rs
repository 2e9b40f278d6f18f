//! Retry policy and wait outcome models.

use crate::error::WaitError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default pause between attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// How the wait loop retries.
///
/// The default retries forever once per second. Attempts start at a fixed
/// rate: a slow attempt shortens the following pause, so a target that never
/// answers still yields one failed attempt per `interval`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPolicy {
    /// Pause between attempts
    pub interval: Duration,
    /// Give up after this many attempts (`None` = never)
    pub max_attempts: Option<u32>,
    /// Give up after this much time (`None` = never)
    pub timeout: Option<Duration>,
    /// Limit for a single attempt (`None` = same as `interval`)
    pub attempt_timeout: Option<Duration>,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_attempts: None,
            timeout: None,
            attempt_timeout: None,
        }
    }
}

impl WaitPolicy {
    /// Set the retry interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the attempt limit.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Set the overall deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the per-attempt limit.
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = Some(attempt_timeout);
        self
    }

    /// Limit applied to a single attempt.
    pub fn effective_attempt_timeout(&self) -> Duration {
        self.attempt_timeout.unwrap_or(self.interval)
    }

    /// Whether the loop can run forever.
    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none() && self.timeout.is_none()
    }

    /// Reject settings the loop cannot honour.
    pub fn validate(&self) -> Result<(), WaitError> {
        if self.interval.is_zero() {
            return Err(WaitError::config("interval must be greater than zero"));
        }
        if self.attempt_timeout.is_some_and(|t| t.is_zero()) {
            return Err(WaitError::config("attempt timeout must be greater than zero"));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(WaitError::config("timeout must be greater than zero"));
        }
        if self.max_attempts == Some(0) {
            return Err(WaitError::config("max attempts must be at least 1"));
        }
        Ok(())
    }
}

/// A failed attempt, handed to the waiting-message callback.
#[derive(Debug, Clone)]
pub struct RetryEvent {
    /// Display form of the probed target
    pub target: String,
    /// 1-based attempt number that just failed
    pub attempt: u32,
    /// Time since waiting started
    pub elapsed: Duration,
    /// Why the attempt failed
    pub reason: String,
    /// Category of the failure
    pub category: &'static str,
}

impl RetryEvent {
    /// Human-readable waiting line.
    pub fn message(&self) -> String {
        format!("Waiting for {} (attempt {}): {}", self.target, self.attempt, self.reason)
    }
}

/// Result of a successful wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitReport {
    /// Display form of the probed target
    pub target: String,
    /// Attempts made, including the successful one
    pub attempts: u32,
    /// Time from start until the target was ready
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    /// When waiting started
    pub started_at: DateTime<Utc>,
}

impl WaitReport {
    /// Whether the target was ready on the first probe.
    pub fn was_immediate(&self) -> bool {
        self.attempts == 1
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_retries_forever() {
        let policy = WaitPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert!(policy.is_unbounded());
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_attempt_timeout_follows_interval_unless_set() {
        let policy = WaitPolicy::default();
        assert_eq!(policy.effective_attempt_timeout(), Duration::from_secs(1));

        let policy = policy.with_interval(Duration::from_millis(300));
        assert_eq!(policy.effective_attempt_timeout(), Duration::from_millis(300));

        let policy = policy.with_attempt_timeout(Duration::from_secs(4));
        assert_eq!(policy.effective_attempt_timeout(), Duration::from_secs(4));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let zero_interval = WaitPolicy::default().with_interval(Duration::ZERO);
        assert!(matches!(zero_interval.validate(), Err(WaitError::Config { .. })));

        let zero_attempts = WaitPolicy::default().with_max_attempts(0);
        assert!(matches!(zero_attempts.validate(), Err(WaitError::Config { .. })));

        let zero_attempt_timeout = WaitPolicy::default().with_attempt_timeout(Duration::ZERO);
        assert!(zero_attempt_timeout.validate().is_err());

        let zero_timeout = WaitPolicy::default().with_timeout(Duration::ZERO);
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_retry_event_message() {
        let event = RetryEvent {
            target: "localhost:5432".to_string(),
            attempt: 3,
            elapsed: Duration::from_secs(2),
            reason: "Connection error: refused".to_string(),
            category: "Connection",
        };
        assert_eq!(
            event.message(),
            "Waiting for localhost:5432 (attempt 3): Connection error: refused"
        );
    }

    #[test]
    fn test_report_json() {
        let report = WaitReport {
            target: "localhost:80".to_string(),
            attempts: 1,
            elapsed: Duration::from_millis(1500),
            started_at: Utc::now(),
        };
        assert!(report.was_immediate());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["elapsed"], 1500);
        assert_eq!(value["attempts"], 1);
        let back: WaitReport = serde_json::from_value(value).unwrap();
        assert_eq!(back.elapsed, report.elapsed);
    }
}
