// Retry Utility: the single retry-with-backoff loop used by every fetch.
//
// Attempt 1 runs immediately; attempt k (k >= 2) waits base * 2^(k-2), capped at max_delay.

use crate::error::SpoolError;
use rand::RngExt;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Attempt budget and backoff schedule for one resource.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Zero behaves as one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay, jitter included.
    pub max_delay: Duration,
    /// Adds a random `[0, base_delay / 2)` on top of the exponential delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait before the given attempt (1-indexed). Attempt 1 never waits.
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        // Saturate instead of overflowing for very large attempt numbers.
        let factor = 1u32.checked_shl(attempt - 2).unwrap_or(u32::MAX);
        let delay = self
            .base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay));

        if self.jitter {
            delay + self.jitter_within(self.max_delay.saturating_sub(delay))
        } else {
            delay
        }
    }

    /// Random extra delay below both `base_delay / 2` and `headroom`.
    fn jitter_within(&self, headroom: Duration) -> Duration {
        let bound = (self.base_delay / 2).min(headroom);
        let bound_ms = bound.as_millis().min(u128::from(u64::MAX)) as u64;
        if bound_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..bound_ms))
    }
}

/// What the retry loop should do with the outcome of one attempt.
pub enum RetryAction<T> {
    Success(T),
    /// Transient failure; try again if the budget allows.
    Retry(SpoolError),
    /// Permanent failure; stop now.
    Fail(SpoolError),
}

/// Runs `operation` until it succeeds, fails permanently or the attempt
/// budget of `policy` is spent, sleeping between attempts.
///
/// `operation` receives the 1-indexed attempt number. On failure the error of
/// the last attempt is returned together with the number of attempts made.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, (SpoolError, u32)>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = RetryAction<T>>,
{
    let budget = policy.attempts();
    let mut attempt = 1;

    loop {
        let err = match operation(attempt).await {
            RetryAction::Success(value) => return Ok(value),
            RetryAction::Fail(err) => return Err((err, attempt)),
            RetryAction::Retry(err) if attempt >= budget => return Err((err, attempt)),
            RetryAction::Retry(err) => err,
        };

        attempt += 1;
        let delay = policy.delay_before_attempt(attempt);
        warn!(
            attempt,
            budget,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Attempt failed, backing off"
        );
        tokio::time::sleep(delay).await;
    }
}
