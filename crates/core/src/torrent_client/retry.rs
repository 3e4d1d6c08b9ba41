//! Bounded retry with exponential backoff for daemon calls.

use std::future::Future;

use tracing::warn;

use super::TorrentClientError;
use crate::config::RetryPolicy;

/// Run `call` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are exhausted.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, TorrentClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TorrentClientError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    error = %e,
                    "Daemon call failed, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
