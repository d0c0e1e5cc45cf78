//! Bounded exponential backoff for outbound model calls.
//!
//! [`RetryPolicy::invoke`] wraps any fallible async operation. A caller-supplied
//! classifier decides which errors are transient; everything else propagates
//! on the first failure. The wait before retry `n` (0-based) is
//! `2^n * base_delay_ms`, so the defaults wait 1s, then 2s.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ComforterError, Result};

/// Default total number of attempts (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for exponential backoff in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Retry policy for rate-limited calls.
///
/// # Examples
///
/// ```
/// use comforter::retry::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts, 3);
/// assert_eq!(policy.delay_for_attempt(1).as_millis(), 2000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Base delay in milliseconds.
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the base delay in milliseconds.
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Delay to wait after the failed attempt with index `attempt` (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    /// Sum of every backoff delay taken when all attempts fail with a retryable error.
    pub fn total_backoff(&self) -> Duration {
        (0..self.attempts().saturating_sub(1))
            .map(|attempt| self.delay_for_attempt(attempt))
            .sum()
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Run `operation`, retrying errors for which `is_retryable` returns true.
    ///
    /// Non-retryable errors and the error from the final attempt are returned
    /// unchanged.
    pub async fn invoke<T, E, F, Fut, C>(
        &self,
        is_retryable: C,
        mut operation: F,
    ) -> std::result::Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        C: Fn(&E) -> bool,
        E: Display,
    {
        let attempts = self.attempts();
        let mut attempt = 0u32;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if attempt + 1 >= attempts || !is_retryable(&error) {
                        return Err(error);
                    }
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// [`invoke`](Self::invoke) with the crate-wide classifier: only
    /// [`ComforterError::RateLimited`] is retried.
    pub async fn invoke_model<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.invoke(ComforterError::is_rate_limited, operation).await
    }
}
