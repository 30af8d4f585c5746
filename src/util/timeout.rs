//! Deadline wrapper for backend calls.

use std::future::Future;
use std::time::Duration;

use crate::error::ClientError;

/// Run a backend call under a deadline.
///
/// Elapsing maps to `ClientError::Timeout` carrying the limit in
/// milliseconds, which `is_retryable()` classifies as transient for the
/// retry policy. The chat stream does not use this; `ChatSession` applies
/// its own whole-stream deadline.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    let limit_ms = duration.as_millis() as u64;
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!(limit_ms, "Backend call exceeded deadline");
            Err(ClientError::Timeout(limit_ms))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapsed_future_becomes_timeout_error() {
        let result: Result<(), ClientError> = with_timeout(Duration::from_millis(100), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ClientError::Timeout(100))));
    }

    #[tokio::test(start_paused = true)]
    async fn prompt_future_passes_through() {
        let result = with_timeout(Duration::from_secs(1), async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }
}
