//! Fetch worker: one unit of concurrency
//!
//! A worker pulls a [`WorkItem`], waits on its rate limiter, performs the
//! HTTP fetch wrapped in the retry policy, and hands the markup to the pure
//! extraction function. Fetch failures are retryable; parse failures are not.

use crate::extract::{parse_article, ArticleRecord};
use crate::pipeline::{RateLimiter, RetryPolicy};
use crate::MuralError;
use reqwest::Client;
use std::time::Duration;

/// One unit of fetch work tracked through its lifecycle states.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Stable identity of this item; the checkpoint's completed set is keyed
    /// by it
    pub id: String,

    /// URL to fetch
    pub url: String,

    /// Position in the original input list, for ordered output
    pub index: usize,

    /// Total attempts made (including the first); set by the owning worker
    pub attempt_count: u32,

    pub state: WorkState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkState {
    Pending,
    InFlight,
    Succeeded,
    Failed,
}

impl WorkState {
    /// Terminal states are immutable; a worker never transitions out of them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl WorkItem {
    pub fn new(id: impl Into<String>, url: impl Into<String>, index: usize) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            index,
            attempt_count: 0,
            state: WorkState::Pending,
        }
    }
}

/// Result of processing one WorkItem: the item in its terminal state plus
/// either the extracted record or the classified error.
#[derive(Debug)]
pub struct FetchOutcome {
    pub item: WorkItem,
    pub result: Result<ArticleRecord, MuralError>,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Builds the shared HTTP client used by all fetch workers.
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.to_string())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Owns one worker's limiter and drives fetch/parse for successive items.
pub struct FetchWorker {
    client: Client,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl FetchWorker {
    pub fn new(client: Client, delay: Duration, retry: RetryPolicy) -> Self {
        Self {
            client,
            limiter: RateLimiter::new(delay),
            retry,
        }
    }

    /// Processes a single item to a terminal state.
    pub async fn process(&mut self, mut item: WorkItem) -> FetchOutcome {
        item.state = WorkState::InFlight;
        self.limiter.acquire().await;

        let url = item.url.clone();
        let client = self.client.clone();
        let (fetched, attempts) = self
            .retry
            .execute_counted(|| fetch_page(client.clone(), url.clone()))
            .await;
        item.attempt_count = attempts;

        let result = match fetched {
            Ok(body) => match parse_article(&body, &item.url) {
                Ok(record) => Ok(record),
                Err(e) => {
                    tracing::warn!("Parse failed for {}: {}", item.url, e);
                    Err(e)
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Fetch failed for {} after {} attempt(s): {}",
                    item.url,
                    attempts,
                    e
                );
                Err(e)
            }
        };

        item.state = if result.is_ok() {
            WorkState::Succeeded
        } else {
            WorkState::Failed
        };
        FetchOutcome { item, result }
    }
}

/// Fetches one page body, classifying transport and status failures.
///
/// 5xx and 429 map to retryable errors; other non-success statuses are
/// treated as permanent for this run.
pub async fn fetch_page(client: Client, url: String) -> Result<String, MuralError> {
    let response = client.get(&url).send().await.map_err(|e| {
        if e.is_timeout() {
            MuralError::Timeout { url: url.clone() }
        } else {
            MuralError::Network {
                url: url.clone(),
                message: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(MuralError::Http {
            url,
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|e| MuralError::Network {
        url,
        message: e.to_string(),
    })
}
