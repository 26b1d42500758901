//! Batch checkpointing: durable, resumable scrape progress
//!
//! The checkpointer persists [`BatchState`] as JSON after every
//! `save_interval` completed items. Flushes are atomic (write to a temp file,
//! then rename over the target) so a crash mid-flush never corrupts the last
//! good checkpoint. On restart the orchestrator loads the state and skips
//! every id already in the completed set.

use crate::extract::ArticleRecord;
use crate::pipeline::FetchOutcome;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Durable snapshot of batch progress.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchState {
    /// Ids that reached a terminal state (succeeded or failed)
    pub completed_ids: BTreeSet<String>,

    /// Successfully extracted records, in completion order
    pub results: Vec<ArticleRecord>,

    /// Failed ids with the error that ended them, for manual follow-up
    #[serde(default)]
    pub failures: BTreeMap<String, String>,

    pub last_checkpoint_at: Option<DateTime<Utc>>,
}

impl BatchState {
    pub fn is_completed(&self, id: &str) -> bool {
        self.completed_ids.contains(id)
    }
}

/// Accumulates outcomes and flushes them to disk on a fixed cadence.
///
/// Single writer: all mutation funnels through `append`, even when producers
/// are concurrent.
pub struct Checkpointer {
    path: PathBuf,
    save_interval: usize,
    state: BatchState,
    pending: usize,
    periodic_flushes: u64,
}

impl Checkpointer {
    /// Opens the checkpoint at `path`, loading prior state when the file
    /// exists.
    pub fn open(path: impl Into<PathBuf>, save_interval: usize) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let state: BatchState = serde_json::from_str(&content)?;
            tracing::info!(
                "Loaded checkpoint: {} completed, {} results",
                state.completed_ids.len(),
                state.results.len()
            );
            state
        } else {
            BatchState::default()
        };

        Ok(Self {
            path,
            save_interval: save_interval.max(1),
            state,
            pending: 0,
            periodic_flushes: 0,
        })
    }

    pub fn state(&self) -> &BatchState {
        &self.state
    }

    /// Records one terminal outcome; flushes when the interval is reached.
    ///
    /// Returns true if this append triggered a flush.
    pub fn append(&mut self, outcome: &FetchOutcome) -> Result<bool> {
        self.state.completed_ids.insert(outcome.item.id.clone());
        match &outcome.result {
            Ok(record) => self.state.results.push(record.clone()),
            Err(e) => {
                self.state
                    .failures
                    .insert(outcome.item.id.clone(), e.to_string());
            }
        }

        self.pending += 1;
        if self.pending >= self.save_interval {
            self.flush()?;
            self.periodic_flushes += 1;
            return Ok(true);
        }
        Ok(false)
    }

    /// Flushes unconditionally. Called at end of run so no completed work is
    /// ever lost to an unfinished interval.
    pub fn flush(&mut self) -> Result<()> {
        self.state.last_checkpoint_at = Some(Utc::now());

        let tmp_path = self.path.with_extension("tmp");
        let json = serde_json::to_string_pretty(&self.state)?;
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;

        self.pending = 0;
        tracing::debug!(
            "Checkpoint flushed: {} completed ids",
            self.state.completed_ids.len()
        );
        Ok(())
    }

    /// Number of interval-triggered flushes so far (excludes explicit final
    /// flushes).
    pub fn periodic_flush_count(&self) -> u64 {
        self.periodic_flushes
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{WorkItem, WorkState};
    use crate::MuralError;
    use tempfile::tempdir;

    fn success_outcome(id: &str, index: usize) -> FetchOutcome {
        let mut item = WorkItem::new(id, format!("https://p.example/{id}"), index);
        item.state = WorkState::Succeeded;
        item.attempt_count = 1;
        FetchOutcome {
            item,
            result: Ok(ArticleRecord {
                url: format!("https://p.example/{id}"),
                title: Some(format!("Title {id}")),
                author: None,
                date: None,
                featured_image_url: None,
                content_html: "<p>x</p>".to_string(),
                content_images: vec![],
            }),
        }
    }

    fn failure_outcome(id: &str, index: usize) -> FetchOutcome {
        let mut item = WorkItem::new(id, format!("https://p.example/{id}"), index);
        item.state = WorkState::Failed;
        FetchOutcome {
            item,
            result: Err(MuralError::Parse {
                url: format!("https://p.example/{id}"),
                message: "bad markup".to_string(),
            }),
        }
    }

    #[test]
    fn flushes_on_interval_boundaries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let mut cp = Checkpointer::open(&path, 5).unwrap();

        for i in 0..12 {
            cp.append(&success_outcome(&format!("n{i}"), i)).unwrap();
        }

        // 12 successes with interval 5: flushes at 5 and 10 only
        assert_eq!(cp.periodic_flush_count(), 2);

        // The on-disk state holds the first 10; the last 2 are pending
        let disk: BatchState =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(disk.completed_ids.len(), 10);

        cp.flush().unwrap();
        let disk: BatchState =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(disk.completed_ids.len(), 12);
    }

    #[test]
    fn reload_skips_completed_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");

        {
            let mut cp = Checkpointer::open(&path, 1).unwrap();
            cp.append(&success_outcome("a", 0)).unwrap();
            cp.append(&failure_outcome("b", 1)).unwrap();
        }

        let cp = Checkpointer::open(&path, 1).unwrap();
        assert!(cp.state().is_completed("a"));
        assert!(cp.state().is_completed("b"));
        assert!(!cp.state().is_completed("c"));
        assert_eq!(cp.state().results.len(), 1);
        assert_eq!(cp.state().failures.len(), 1);
    }

    #[test]
    fn failures_keep_their_error_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let mut cp = Checkpointer::open(&path, 1).unwrap();
        cp.append(&failure_outcome("b", 0)).unwrap();

        let message = cp.state().failures.get("b").unwrap();
        assert!(message.contains("bad markup"));
    }

    #[test]
    fn flush_replaces_atomically() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let mut cp = Checkpointer::open(&path, 1).unwrap();
        cp.append(&success_outcome("a", 0)).unwrap();

        // No temp file lingers after a flush
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn open_on_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let cp = Checkpointer::open(dir.path().join("none.json"), 5).unwrap();
        assert!(cp.state().completed_ids.is_empty());
        assert!(cp.state().last_checkpoint_at.is_none());
    }
}
