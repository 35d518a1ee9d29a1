//! Bounded retry with exponential backoff, and a timeout race.
//!
//! Both inference paths wrap their network calls in these helpers; the
//! polling loop in the pipeline crate uses its own linear schedule and
//! does not go through here.

use std::future::Future;
use std::time::Duration;

/// Default per-request timeout for provider calls.
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Default attempt ceiling for retried provider calls.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// The timer side of [`with_timeout`] won the race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation timed out after {0} ms")]
pub struct TimeoutError(pub u64);

/// Delay before retrying after a failed attempt (0-indexed).
///
/// Pure exponential backoff, no jitter: `2^attempt * 1000 ms`.
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(2u64.saturating_pow(attempt).saturating_mul(1_000))
}

/// Invoke `operation` up to `max_attempts` times, sleeping
/// [`backoff_delay`] between failed attempts (never after the last).
///
/// The 0-indexed attempt number is passed to each invocation so callers
/// can stamp per-attempt bookkeeping before the call goes out. On
/// exhaustion the last error is returned unchanged.
pub async fn with_retry<T, E, F, Fut>(mut operation: F, max_attempts: u32) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if attempt >= max_attempts.max(1) {
                    return Err(e);
                }
                tokio::time::sleep(backoff_delay(attempt - 1)).await;
            }
        }
    }
}

/// Race `future` against a timer of `ms` milliseconds.
///
/// The future is spawned as its own task: on timeout we stop waiting but
/// do not cancel it — it may still complete in the background and its
/// result is discarded.
pub async fn with_timeout<T, F>(future: F, ms: u64) -> Result<T, TimeoutError>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::spawn(future);
    match tokio::time::timeout(Duration::from_millis(ms), handle).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(join_error)) => std::panic::resume_unwind(join_error.into_panic()),
        Err(_elapsed) => Err(TimeoutError(ms)),
    }
}
