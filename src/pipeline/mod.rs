//! Concurrent fetch pipeline
//!
//! The pipeline is a bounded pool of workers drawing from a shared queue.
//! Each worker rate-limits its own requests and wraps every fetch in the
//! retry policy; results stream back over a channel.

mod limiter;
mod pool;
mod retry;
mod worker;

pub use limiter::RateLimiter;
pub use pool::WorkerPool;
pub use retry::{RetryPolicy, Retryable};
pub use worker::{build_http_client, fetch_page, FetchOutcome, FetchWorker, WorkItem, WorkState};
