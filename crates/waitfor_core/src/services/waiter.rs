//! The fixed-interval wait loop.
//!
//! Every attempt-level failure (refused, unresolvable, bad credentials,
//! server starting up) counts as "not ready yet". Attempts start once per
//! `interval`; an attempt is cut off after the attempt timeout, which defaults
//! to the interval. With the default [`WaitPolicy`] the loop never gives up.

use crate::error::WaitError;
use crate::models::{RetryEvent, WaitPolicy, WaitReport};
use crate::services::Probe;

use chrono::Utc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Repeats a [`Probe`] until it succeeds or the policy gives up.
#[derive(Debug, Clone)]
pub struct Waiter<P> {
    probe: P,
    policy: WaitPolicy,
}

impl<P: Probe> Waiter<P> {
    /// Create a waiter with the given policy.
    pub fn new(probe: P, policy: WaitPolicy) -> Self {
        Self { probe, policy }
    }

    /// Create a waiter that retries forever once per second.
    pub fn with_default_policy(probe: P) -> Self {
        Self::new(probe, WaitPolicy::default())
    }

    /// Get the probe.
    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Get the retry policy.
    pub fn policy(&self) -> &WaitPolicy {
        &self.policy
    }

    /// Block until the probe succeeds.
    ///
    /// `on_retry` is called after every failed attempt, including the last
    /// one before giving up. Cancelling `cancel` interrupts both a running
    /// attempt and the pause between attempts.
    pub async fn wait<F>(
        &self,
        mut on_retry: F,
        cancel: &CancellationToken,
    ) -> Result<WaitReport, WaitError>
    where
        F: FnMut(&RetryEvent),
    {
        self.policy.validate()?;

        let target = self.probe.target();
        let started_at = Utc::now();
        let start = Instant::now();
        let mut attempt: u32 = 0;

        tracing::info!(
            target_name = %target,
            interval_ms = self.policy.interval.as_millis() as u64,
            max_attempts = ?self.policy.max_attempts,
            timeout_secs = ?self.policy.timeout.map(|t| t.as_secs()),
            "Waiting for service"
        );

        loop {
            // An attempt never runs past the overall deadline.
            let mut limit = self.policy.effective_attempt_timeout();
            if let Some(timeout) = self.policy.timeout {
                let remaining = timeout.saturating_sub(start.elapsed());
                if remaining.is_zero() {
                    return Err(self.deadline_passed(target, start.elapsed(), attempt));
                }
                limit = limit.min(remaining);
            }

            attempt = attempt.saturating_add(1);
            let attempt_start = Instant::now();

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(&target, attempt)),
                outcome = tokio::time::timeout(limit, self.probe.probe()) => outcome,
            };

            let error = match outcome {
                Ok(Ok(())) => {
                    let elapsed = start.elapsed();
                    tracing::info!(
                        target_name = %target,
                        attempts = attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Service is ready"
                    );
                    return Ok(WaitReport { target, attempts: attempt, elapsed, started_at });
                }
                Ok(Err(e)) => e,
                Err(_) => WaitError::attempt_timeout(limit),
            };

            let event = RetryEvent {
                target: target.clone(),
                attempt,
                elapsed: start.elapsed(),
                reason: error.to_string(),
                category: error.category(),
            };
            tracing::debug!(
                target_name = %target,
                attempt,
                category = event.category,
                error = %error,
                "Service not ready"
            );
            on_retry(&event);

            if let Some(max_attempts) = self.policy.max_attempts {
                if attempt >= max_attempts {
                    tracing::warn!(target_name = %target, attempts = attempt, "Giving up");
                    return Err(WaitError::exhausted(target, attempt, error));
                }
            }

            // Attempts start once per interval; time spent probing is not added on top.
            let mut pause = self.policy.interval.saturating_sub(attempt_start.elapsed());
            if let Some(timeout) = self.policy.timeout {
                pause = pause.min(timeout.saturating_sub(start.elapsed()));
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(&target, attempt)),
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    /// Block until the probe succeeds, without a waiting callback or
    /// cancellation.
    pub async fn wait_until_ready(&self) -> Result<WaitReport, WaitError> {
        self.wait(|_| {}, &CancellationToken::new()).await
    }

    fn deadline_passed(&self, target: String, elapsed: Duration, attempts: u32) -> WaitError {
        tracing::warn!(
            target_name = %target,
            attempts,
            elapsed_ms = elapsed.as_millis() as u64,
            "Deadline passed"
        );
        WaitError::timeout(target, elapsed, attempts)
    }

    fn cancelled(&self, target: &str, attempt: u32) -> WaitError {
        tracing::info!(target_name = %target, attempts = attempt, "Waiting cancelled");
        WaitError::cancelled(target)
    }
}
