use std::future::Future;
use std::time::Duration;

use crate::failure::Failure;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Outcome of a single attempt within one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    RetryableFailure(Failure),
    TerminalFailure(Failure),
}

/// One attempt of a retry loop. Exists only for the lifetime of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCallAttempt {
    /// 1-based attempt number
    pub attempt: u32,
    /// How long the loop waited before issuing this attempt
    pub delay_before: Duration,
    pub outcome: AttemptOutcome,
}

/// Bounded retry with exponential backoff.
///
/// The delay before attempt `k` (k >= 2) is `base_delay * 2^(k-2)`; the first
/// attempt goes out immediately. The policy holds no state between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay to wait before issuing `attempt` (1-based).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(31);
        self.base_delay.saturating_mul(1_u32 << exponent)
    }

    /// The full delay schedule, one entry per attempt.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> {
        let policy = *self;
        (1..=policy.max_attempts).map(move |attempt| policy.delay_before(attempt))
    }

    /// Runs `op` until it succeeds, fails terminally, or attempts run out.
    ///
    /// # Errors
    /// Returns the last failure seen when no attempt succeeded.
    pub async fn call<T, F, Fut>(&self, label: &str, op: F) -> Result<T, Failure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Failure>>,
    {
        self.call_recorded(label, op).await.0
    }

    /// Like [`RetryPolicy::call`], also returning every attempt made.
    pub async fn call_recorded<T, F, Fut>(
        &self,
        label: &str,
        mut op: F,
    ) -> (Result<T, Failure>, Vec<RemoteCallAttempt>)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Failure>>,
    {
        let mut attempts = Vec::with_capacity(self.max_attempts as usize);
        let mut attempt = 1;

        loop {
            let delay_before = self.delay_before(attempt);
            if !delay_before.is_zero() {
                tokio::time::sleep(delay_before).await;
            }

            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(label, attempt, "remote call recovered");
                    }
                    attempts.push(RemoteCallAttempt {
                        attempt,
                        delay_before,
                        outcome: AttemptOutcome::Success,
                    });
                    return (Ok(value), attempts);
                }
                Err(failure) => {
                    let exhausted = attempt >= self.max_attempts;
                    if exhausted || !failure.kind.is_retryable() {
                        tracing::warn!(
                            label,
                            attempt,
                            kind = %failure.kind,
                            "remote call failed: {failure}"
                        );
                        attempts.push(RemoteCallAttempt {
                            attempt,
                            delay_before,
                            outcome: AttemptOutcome::TerminalFailure(failure.clone()),
                        });
                        return (Err(failure), attempts);
                    }

                    tracing::warn!(
                        label,
                        attempt,
                        max_attempts = self.max_attempts,
                        kind = %failure.kind,
                        "remote call attempt failed, retrying: {failure}"
                    );
                    attempts.push(RemoteCallAttempt {
                        attempt,
                        delay_before,
                        outcome: AttemptOutcome::RetryableFailure(failure),
                    });
                    attempt += 1;
                }
            }
        }
    }
}
