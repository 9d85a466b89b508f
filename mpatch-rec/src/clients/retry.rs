//! Bounded retry for transient upstream failures
//!
//! Used by the catalog searcher and audio resolver around their collaborator
//! calls. Only [`UpstreamError::is_transient`] failures are retried, with a
//! doubling backoff between attempts.

use crate::error::UpstreamError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry bounds for one logical upstream call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per retry
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// One retry after 250ms
    pub const fn single_retry() -> Self {
        Self {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(250),
        }
    }

    /// No retries at all
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }

    pub fn with_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_retry()
    }
}

/// Run `op` until it succeeds, fails permanently, or attempts run out
pub async fn with_retry<T, F, Fut>(label: &str, policy: RetryPolicy, mut op: F) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let mut attempt = 1;
    let mut backoff = policy.initial_backoff;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts.max(1) => {
                warn!(
                    call = label,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Transient upstream failure, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy::single_retry().with_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_transient_failure_retried_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry("test", fast(), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(UpstreamError::Network("reset".into()))
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry("test", fast(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(UpstreamError::Timeout("slow".into()))
        })
        .await;

        assert!(matches!(result, Err(UpstreamError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry("test", fast(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(UpstreamError::Parse("bad".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_none_policy_single_attempt() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let _: Result<(), _> = with_retry("test", RetryPolicy::none(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(UpstreamError::Network("down".into()))
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
