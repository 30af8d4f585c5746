//! Retry policy for idempotent backend calls.

use std::future::Future;
use std::time::Duration;

use crate::error::ClientError;

/// Backoff schedule for retryable failures.
///
/// Only errors `ClientError::is_retryable` classifies as transient are
/// retried. A rate-limit response that names its own wait
/// (`RateLimited { retry_after_ms }`) is honored as a lower bound on the
/// sleep before the next attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, counting the first.
    pub max_attempts: u32,
    /// Sleep before the first retry.
    pub initial_backoff: Duration,
    /// Ceiling for the growing sleep.
    pub max_backoff: Duration,
    /// Growth factor between retries.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Run `operation` until it succeeds, fails non-retryably, or attempts
    /// run out. The last error is returned as-is.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;

        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            if !error.is_retryable() || attempt >= self.max_attempts {
                return Err(error);
            }

            let mut wait = jitter(backoff);
            // A 429 body may name its own wait; never sleep less than the
            // backend asked for.
            if let ClientError::RateLimited {
                retry_after_ms: Some(ms),
            } = &error
            {
                wait = wait.max(Duration::from_millis(*ms));
            }

            tracing::warn!(
                attempt,
                max_attempts = self.max_attempts,
                wait_ms = wait.as_millis() as u64,
                error = %error,
                "Backend call failed, retrying"
            );
            tokio::time::sleep(wait).await;

            backoff = Duration::from_secs_f64(
                (backoff.as_secs_f64() * self.multiplier).min(self.max_backoff.as_secs_f64()),
            );
            attempt += 1;
        }
    }
}

/// Spread a sleep over 75%–125% of its nominal value so concurrent clients
/// hitting the same outage do not re-poll in lockstep.
fn jitter(nominal: Duration) -> Duration {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos()
        .hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);

    let unit = (hasher.finish() % 1000) as f64 / 1000.0;
    Duration::from_secs_f64(nominal.as_secs_f64() * (0.75 + unit * 0.5))
}
