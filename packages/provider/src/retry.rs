//! Timeout and backoff wrapper for provider calls.
//!
//! Every provider request goes through [`with_backoff`]. Quota errors are
//! retried with exponential backoff (1s, 2s, 4s by default). Every other
//! error, including a timeout, is terminal for that call so the
//! estimation chain can move on to its next method.

use std::future::Future;
use std::time::Duration;

use crate::ProviderError;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Retry and timeout settings for provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub initial_backoff: Duration,
    /// Upper bound on a single attempt.
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX))
    }
}

/// Runs `call` under the policy's timeout, retrying quota errors.
///
/// The `call` closure is invoked once per attempt to build a fresh
/// request future.
///
/// # Errors
///
/// Returns the first non-retryable [`ProviderError`], a
/// [`ProviderError::Timeout`] if an attempt exceeds the timeout, or
/// [`ProviderError::DataUnavailable`] once quota retries are exhausted.
pub async fn with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut call: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;

    loop {
        let result = tokio::time::timeout(policy.request_timeout, call())
            .await
            .unwrap_or_else(|_| {
                Err(ProviderError::Timeout {
                    seconds: policy.request_timeout.as_secs_f64(),
                })
            });

        match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => {
                if attempt >= policy.max_retries {
                    log::warn!("{label}: giving up after {attempt} retries: {e}");
                    return Err(ProviderError::unavailable(format!(
                        "{label}: quota still exhausted after {attempt} retries ({e})"
                    )));
                }
                let delay = policy.delay_for(attempt);
                attempt += 1;
                log::warn!(
                    "{label}: {e}, retry {attempt}/{} in {delay:?}...",
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                log::debug!("{label}: terminal provider error: {e}");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn quota() -> ProviderError {
        ProviderError::QuotaExceeded {
            message: "rate limited".to_string(),
        }
    }

    #[test]
    fn delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_quota_errors() {
        let calls = &AtomicU32::new(0);
        let result = with_backoff(&RetryPolicy::default(), "test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(quota())
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_quota_becomes_unavailable() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(&RetryPolicy::default(), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(quota())
        })
        .await;

        assert!(matches!(result, Err(ProviderError::DataUnavailable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(&RetryPolicy::default(), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Authentication {
                message: "bad token".to_string(),
            })
        })
        .await;

        assert!(matches!(result, Err(ProviderError::Authentication { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let policy = RetryPolicy {
            request_timeout: Duration::from_secs(5),
            ..RetryPolicy::default()
        };
        let result: Result<(), _> = with_backoff(&policy, "test", || async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(ProviderError::Timeout { .. })));
    }
}
