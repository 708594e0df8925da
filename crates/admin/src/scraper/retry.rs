//! Exponential backoff for transient scraper failures.

use std::future::Future;
use std::time::Duration;

use super::ScraperError;

/// Executes `operation`, retrying transient errors with exponential backoff.
///
/// The wait before retry `n` (0-based) is `backoff_base_secs * 2^n`, or the
/// server's `Retry-After` when that is longer. With `max_retries = 3` the
/// operation is attempted at most 4 times. Non-transient errors are returned
/// immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_transient() || attempt >= max_retries => return Err(err),
            Err(err) => err,
        };

        let mut delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        if let ScraperError::RateLimited {
            retry_after_secs, ..
        } = &err
        {
            delay_secs = delay_secs.max(*retry_after_secs);
        }

        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient scraper error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
