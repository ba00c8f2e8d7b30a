//! Retry loop for single remote calls.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::config::RetryConfig;
use crate::remote::{RemoteError, RemoteResult};

/// Returns how long to wait before `attempt` after `error`.
///
/// A server `retry_after` hint wins when it is longer than the backoff.
pub(crate) fn backoff(config: &RetryConfig, attempt: u32, error: Option<&RemoteError>) -> Duration {
    let delay = config.delay_for_attempt(attempt);
    match error.and_then(RemoteError::retry_after) {
        Some(hint) => delay.max(hint),
        None => delay,
    }
}

/// Runs `op` until it succeeds, fails permanently, or attempts run out.
pub(crate) async fn run_with_retry<T, F, Fut>(config: &RetryConfig, mut op: F) -> RemoteResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RemoteResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < config.max_attempts => {
                attempt += 1;
                let wait = backoff(config, attempt, Some(&e));
                let wait_ms = wait.as_millis() as u64;
                debug!(attempt, error = %e, wait_ms, "retrying remote call");
                if !wait.is_zero() {
                    tokio::time::sleep(wait).await;
                }
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = run_with_retry(&RetryConfig::immediate(3), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(RemoteError::Timeout)
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: RemoteResult<()> = run_with_retry(&RetryConfig::immediate(2), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(RemoteError::Network("reset".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: RemoteResult<()> = run_with_retry(&RetryConfig::immediate(5), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(RemoteError::Rejected("schema".into()))
        })
        .await;

        assert!(matches!(result, Err(RemoteError::Rejected(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retry_after_hint_extends_backoff() {
        let config = RetryConfig::immediate(3);
        let throttled = RemoteError::Throttled {
            retry_after: Some(Duration::from_millis(250)),
        };
        assert_eq!(backoff(&config, 1, Some(&throttled)), Duration::from_millis(250));
        assert_eq!(backoff(&config, 1, None), Duration::ZERO);
    }
}
