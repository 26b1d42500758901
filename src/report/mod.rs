//! Run statistics and end-of-run reporting
//!
//! Accumulates counters while a scrape or migration runs and renders a
//! formatted summary to stdout when the run finishes.

use crate::pipeline::FetchOutcome;
use crate::ErrorKind;
use std::collections::HashMap;

/// Summary counters for one pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    /// Number of items the run attempted to process
    pub attempted: u64,

    /// Items that reached a successful terminal state
    pub succeeded: u64,

    /// Items that exhausted retries or hit a fatal error
    pub failed: u64,

    /// Items that needed more than one attempt
    pub retried: u64,

    /// Remote folders created during migration
    pub folders_created: u64,

    /// Documents uploaded to their taxonomy folder
    pub uploads: u64,

    /// Documents routed to the fallback folder
    pub fallback_uploads: u64,

    /// Failure counts grouped by error classification
    pub errors_by_kind: HashMap<ErrorKind, u64>,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one fetch outcome into the counters.
    pub fn record_outcome(&mut self, outcome: &FetchOutcome) {
        self.attempted += 1;
        if outcome.item.attempt_count > 1 {
            self.retried += 1;
        }
        match &outcome.result {
            Ok(_) => self.succeeded += 1,
            Err(e) => {
                self.failed += 1;
                *self.errors_by_kind.entry(e.kind()).or_insert(0) += 1;
            }
        }
    }

    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, kind: ErrorKind) {
        self.attempted += 1;
        self.failed += 1;
        *self.errors_by_kind.entry(kind).or_insert(0) += 1;
    }

    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        (self.succeeded as f64 / self.attempted as f64) * 100.0
    }
}

/// Prints the run summary to stdout in a formatted manner
pub fn print_report(title: &str, stats: &RunStatistics) {
    println!("=== {} ===\n", title);

    println!("Overview:");
    println!("  Items attempted: {}", stats.attempted);
    println!("  Succeeded: {}", stats.succeeded);
    println!("  Failed: {}", stats.failed);
    println!("  Needed retries: {}", stats.retried);
    println!();

    if stats.folders_created > 0 || stats.uploads > 0 || stats.fallback_uploads > 0 {
        println!("Remote:");
        println!("  Folders created: {}", stats.folders_created);
        println!("  Documents uploaded: {}", stats.uploads);
        if stats.fallback_uploads > 0 {
            println!("  Routed to fallback folder: {}", stats.fallback_uploads);
        }
        println!();
    }

    if !stats.errors_by_kind.is_empty() {
        println!("Error Summary:");
        // Sort kinds by count (descending)
        let mut error_counts: Vec<_> = stats.errors_by_kind.iter().collect();
        error_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in error_counts {
            println!("  {:?}: {}", kind, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} items)",
        stats.success_rate(),
        stats.succeeded,
        stats.attempted
    );
}
