//! Bounded retries with exponential backoff
//!
//! [`RetryPolicy`] is the single choke point for transient-fault handling:
//! every remote call (page fetch, folder create, upload) is wrapped by it.
//! The retryable/fatal split lives on the error type itself via [`Retryable`],
//! so callers cannot accidentally swallow a fatal error as retryable.

use crate::MuralError;
use std::future::Future;
use std::time::Duration;

/// Errors that can declare whether retrying may help.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for MuralError {
    fn is_retryable(&self) -> bool {
        MuralError::is_retryable(self)
    }
}

/// Wraps a fallible async operation with bounded retries and backoff.
///
/// A policy with `max_retries = 3` makes up to 4 attempts in total: the
/// initial call plus three retries. Non-retryable errors propagate
/// immediately without consuming a retry.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }

    pub fn with_delays(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Runs `op`, retrying retryable failures until success or exhaustion.
    ///
    /// Returns the first success, the first non-retryable error, or the last
    /// error once `max_retries` retries have been spent.
    pub async fn execute<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        E: Retryable,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_counted(op).await.0
    }

    /// Like [`execute`](Self::execute), also reporting how many attempts ran.
    ///
    /// The count includes the initial attempt, so a first-try success
    /// reports 1.
    pub async fn execute_counted<T, E, F, Fut>(&self, mut op: F) -> (Result<T, E>, u32)
    where
        E: Retryable,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match op().await {
                Ok(value) => return (Ok(value), attempts),
                Err(err) if !err.is_retryable() => return (Err(err), attempts),
                Err(err) => {
                    let retries_used = attempts - 1;
                    if retries_used >= self.max_retries {
                        return (Err(err), attempts);
                    }
                    let delay = self.backoff_delay(retries_used);
                    tracing::debug!(
                        "Transient failure (attempt {}/{}), retrying in {:?}",
                        attempts,
                        self.max_retries + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Backoff for the given zero-based retry index: `base * 2^n`, capped.
    fn backoff_delay(&self, retry_index: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry_index.min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}
