//! Bounded retry with linearly growing waits.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry policy for per-step image generation.
///
/// After failed attempt `n` the policy waits `n * unit` before the next one,
/// so the defaults (3 attempts, 5 s) wait 5 s and then 10 s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            unit: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, unit: Duration) -> Self {
        Self { attempts, unit }
    }

    /// Wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.unit.saturating_mul(attempt)
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// Returns the last error once every attempt has failed. At least one
    /// attempt is always made.
    pub async fn run<F, Fut, T, E>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => {
                    tracing::warn!(attempt, attempts, error = %e, "attempts exhausted");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        attempt,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
