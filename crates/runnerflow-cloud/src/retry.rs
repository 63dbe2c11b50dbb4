//! Retry policy for cloud operations

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry configuration for cloud operations
///
/// `max_attempts` counts the first try. The delay before retry `n` (0-based)
/// is `initial_delay * backoff_multiplier^n`, capped at `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `retry` (0-based)
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(retry.min(i32::MAX as u32) as i32);
        let delay = self.initial_delay.as_secs_f64() * factor;
        if !delay.is_finite() || delay >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(delay)
        }
    }

    /// Run `operation` until it succeeds or the attempts are exhausted
    ///
    /// `operation` receives the 1-based attempt number. The error of the last
    /// attempt is returned unchanged.
    pub async fn run<T, E, F, Fut>(&self, operation_name: &str, operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_if(operation_name, operation, |_| true).await
    }

    /// Like [`RetryConfig::run`], but errors for which `is_retryable` is
    /// false are returned at once
    pub async fn run_if<T, E, F, Fut, P>(
        &self,
        operation_name: &str,
        mut operation: F,
        is_retryable: P,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !is_retryable(&e) => {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        error = %e,
                        "Attempt failed with a permanent error"
                    );
                    return Err(e);
                }
                Err(e) if attempt >= max_attempts => {
                    tracing::error!(
                        operation = operation_name,
                        attempts = attempt,
                        error = %e,
                        "Giving up after exhausting retries"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_for_attempt(attempt - 1);
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts,
                        delay_secs = delay.as_secs_f64(),
                        error = %e,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
