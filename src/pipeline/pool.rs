//! Worker pool: fan a URL queue out to N workers, fan results back in
//!
//! The pool holds exactly `concurrency` live workers. Items flow through a
//! shared mpsc queue; each worker owns its own rate limiter so cadence is
//! per-worker. Completion order is not guaranteed; [`WorkerPool::run`]
//! re-sorts by original input index, while [`WorkerPool::spawn`] streams
//! outcomes as they complete.

use crate::pipeline::worker::{FetchOutcome, FetchWorker, WorkItem};
use crate::pipeline::RetryPolicy;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Fixed-size pool of fetch workers over a shared work queue.
pub struct WorkerPool {
    client: Client,
    concurrency: usize,
    delay: Duration,
    retry: RetryPolicy,
    stop: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(client: Client, concurrency: usize, delay: Duration, retry: RetryPolicy) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
            delay,
            retry,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Installs a cooperative stop signal. Workers check it between items;
    /// in-flight fetches finish normally.
    pub fn with_stop_signal(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Spawns the workers over `items` and returns the outcome stream.
    ///
    /// Outcomes arrive in completion order. The channel closes once every
    /// worker has drained the queue or observed the stop signal.
    pub fn spawn(&self, items: Vec<WorkItem>) -> mpsc::Receiver<FetchOutcome> {
        let capacity = items.len().max(1);
        let (work_tx, work_rx) = mpsc::channel::<WorkItem>(capacity);
        let (result_tx, result_rx) = mpsc::channel::<FetchOutcome>(capacity);

        // The queue is bounded by the input list; no extra semaphore is
        // needed since the worker count bounds concurrency.
        for item in items {
            work_tx
                .try_send(item)
                .expect("work queue sized to input list");
        }
        drop(work_tx);

        let shared_rx = Arc::new(Mutex::new(work_rx));

        for worker_id in 0..self.concurrency {
            let queue = Arc::clone(&shared_rx);
            let results = result_tx.clone();
            let stop = Arc::clone(&self.stop);
            let mut worker =
                FetchWorker::new(self.client.clone(), self.delay, self.retry.clone());

            tokio::spawn(async move {
                loop {
                    if stop.load(Ordering::Relaxed) {
                        tracing::info!("Worker {} stopping on signal", worker_id);
                        break;
                    }

                    let item = { queue.lock().await.recv().await };
                    let Some(item) = item else { break };

                    tracing::debug!("Worker {} processing {}", worker_id, item.url);
                    let outcome = worker.process(item).await;

                    if results.send(outcome).await.is_err() {
                        // Receiver dropped; nothing left to report to.
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        result_rx
    }

    /// Runs all items to completion and returns outcomes sorted by the
    /// original input index.
    pub async fn run(&self, items: Vec<WorkItem>) -> Vec<FetchOutcome> {
        let mut rx = self.spawn(items);
        let mut outcomes = Vec::new();
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }
        outcomes.sort_by_key(|o| o.item.index);
        outcomes
    }
}
