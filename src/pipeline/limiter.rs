//! Per-worker rate limiting
//!
//! Each fetch worker owns one [`RateLimiter`], so the cadence is enforced per
//! worker and the aggregate request rate scales with worker count.

use std::time::Duration;
use tokio::time::Instant;

/// Enforces a minimum spacing between consecutive requests from one worker.
///
/// `acquire` suspends the caller until at least the configured delay has
/// elapsed since the previous `acquire` returned. Purely a timing gate; it
/// cannot fail.
#[derive(Debug)]
pub struct RateLimiter {
    delay: Duration,
    last_release: Option<Instant>,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_release: None,
        }
    }

    /// Waits until the configured delay has passed since the last release.
    pub async fn acquire(&mut self) {
        if let Some(last) = self.last_release {
            let ready_at = last + self.delay;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        self.last_release = Some(Instant::now());
    }
}
