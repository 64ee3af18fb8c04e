//! Bounded retry for calls to external services.
//!
//! Both the search and completion clients route their outbound calls through
//! [`with_retry`], so the two sides of the pipeline share one failure policy.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Delay applied between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Sleep a fixed duration before the next attempt.
    Fixed(Duration),
}

impl Backoff {
    async fn wait(&self) {
        if let Backoff::Fixed(delay) = self {
            tokio::time::sleep(*delay).await;
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Backoff::None)
    }
}

/// Run `attempt` up to `policy.max_attempts` times, returning the first
/// success. Intermediate faults are logged as warnings; the terminal fault is
/// returned to the caller unchanged.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut attempt: F,
) -> crate::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = crate::Result<T>>,
{
    let mut last_err = None;
    for n in 1..=policy.max_attempts {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if n < policy.max_attempts {
                    warn!(
                        attempt = n,
                        max_attempts = policy.max_attempts,
                        error = %e,
                        "{what} attempt failed, retrying"
                    );
                    policy.backoff.wait().await;
                }
                last_err = Some(e);
            }
        }
    }
    // max_attempts >= 1, so at least one attempt ran.
    Err(last_err.expect("retry loop ran no attempts"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QaError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn returns_first_success_without_further_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Backoff::None);
        let out = with_retry(&policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, QaError>(42) }
        })
        .await
        .unwrap();
        assert_eq!(out, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Backoff::None);
        let out = with_retry(&policy, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(QaError::Completion(format!("boom {n}")))
                } else {
                    Ok("ok".to_string())
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(out, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Backoff::None);
        let err = with_retry(&policy, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err::<(), _>(QaError::Search(format!("boom {n}"))) }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(err.to_string().contains("boom 2"));
    }

    #[tokio::test]
    async fn zero_attempts_is_clamped_to_one() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(0, Backoff::None);
        let _ = with_retry(&policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(QaError::Search("boom".into())) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
