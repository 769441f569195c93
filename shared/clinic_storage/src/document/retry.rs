//! Linear backoff for document writes

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::blob::BlobError;

/// Default number of write attempts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay between attempts
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// How often and how patiently a failed write is repeated
///
/// The wait before retry `k` (counting from 1) is `base_delay * (k + 1)`, so the defaults
/// wait 2 s after the first failure and 3 s after the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Unit of the backoff schedule
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

/// Last error of an exhausted retry loop
#[derive(Debug)]
pub struct RetryError {
    /// Attempts made before giving up
    pub attempts: u32,
    /// Error returned by the final attempt
    pub source: BlobError,
}

impl RetryPolicy {
    /// Policy without any wait between attempts
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    /// Wait applied before retry number `retry` (1-based)
    #[must_use]
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(retry.saturating_add(1))
    }

    /// Runs `operation` until it succeeds, fails with a permanent error, or attempts run out
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt together with the attempt count
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BlobError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.delay_before_retry(attempt);
                    debug!(
                        "{what} failed (attempt {attempt}/{max_attempts}): {err}; retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(source) => {
                    return Err(RetryError {
                        attempts: attempt,
                        source,
                    })
                }
            }
        }
    }
}
