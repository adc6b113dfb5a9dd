//! Retry with jittered exponential backoff.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::errors::BatchResult;
use crate::domain::models::RetryConfig;
use crate::domain::ports::Diagnostics;

/// Growth factor between consecutive retry delays.
const BACKOFF_FACTOR: f64 = 2.0;

/// Retry policy with jittered exponential backoff
///
/// Delay before retry `n` (0-based) is `min(max_delay, min_delay * 2^n)`,
/// adjusted by up to `jitter` in either direction.
///
/// # Retry Decision
/// - Retry on: 429, 5xx, timeouts and connectivity failures
/// - Do NOT retry: other 4xx, protocol violations, anything unrecognised
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first
    max_attempts: u32,
    /// Delay before the first retry in milliseconds
    min_delay_ms: u64,
    /// Maximum delay in milliseconds
    max_delay_ms: u64,
    /// Jitter fraction (0.0-1.0)
    jitter: f64,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Arguments
    /// * `max_attempts` - Total attempts (recommended: 3, at least 1)
    /// * `min_delay_ms` - First retry delay (recommended: 500ms)
    /// * `max_delay_ms` - Cap on any delay (recommended: 5000ms)
    /// * `jitter` - Randomisation fraction (recommended: 0.1)
    ///
    /// # Example
    /// ```
    /// use embatch::services::retry::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(3, 500, 5_000, 0.1);
    /// assert_eq!(policy.max_attempts(), 3);
    /// ```
    pub fn new(max_attempts: u32, min_delay_ms: u64, max_delay_ms: u64, jitter: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_delay_ms,
            max_delay_ms: max_delay_ms.max(min_delay_ms),
            jitter: jitter.clamp(0.0, 1.0),
        }
    }

    /// Policy from the `retry` configuration section.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.min_delay_ms,
            config.max_delay_ms,
            config.jitter,
        )
    }

    /// Total attempts per call, including the first.
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.min_delay_ms))
            .with_randomization_factor(self.jitter)
            .with_multiplier(BACKOFF_FACTOR)
            .with_max_interval(Duration::from_millis(self.max_delay_ms))
            .with_max_elapsed_time(None)
            .build()
    }

    /// Execute an operation, re-issuing it on retryable failures
    ///
    /// Every retry and the final give-up are recorded to `diagnostics`
    /// before sleeping or returning.
    ///
    /// # Arguments
    /// * `label` - Operation name used in diagnostics (e.g. "create")
    /// * `diagnostics` - Sink for retry records
    /// * `operation` - Factory producing a fresh attempt each call
    ///
    /// # Returns
    /// * `Ok(T)` - An attempt succeeded
    /// * `Err(BatchError)` - Fatal error, or the last error once attempts ran out
    pub async fn execute<F, Fut, T>(
        &self,
        label: &str,
        diagnostics: &Diagnostics,
        mut operation: F,
    ) -> BatchResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BatchResult<T>>,
    {
        let mut backoff = self.backoff();
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(label, attempt, "batch call succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(err) => {
                    let retryable = err.is_retryable();
                    if !retryable || attempt >= self.max_attempts {
                        diagnostics.record(
                            &format!("batch {label} gave up after {attempt} attempt(s)"),
                            json!({ "error": err.to_string(), "retryable": retryable }),
                        );
                        return Err(err);
                    }

                    let delay = backoff
                        .next_backoff()
                        .unwrap_or(Duration::from_millis(self.max_delay_ms));
                    warn!(
                        label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient batch error, retrying"
                    );
                    diagnostics.record(
                        &format!(
                            "batch {label} retry {attempt}/{} in {}ms",
                            self.max_attempts,
                            delay.as_millis()
                        ),
                        json!({ "error": err.to_string() }),
                    );

                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    /// Create a retry policy with recommended defaults:
    /// - Max attempts: 3
    /// - Min delay: 500ms
    /// - Max delay: 5s
    /// - Jitter: 10%
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
