//! Folder planning: taxonomy paths to remote folder ids
//!
//! Converts classified documents into the target folder tree
//! `[root, category, type, year-or-UNDATED]`, creating each distinct path on
//! the remote platform at most once per run. The path cache is mandatory, not
//! an optimization: remote creates are not idempotent, so a duplicate call
//! makes a duplicate folder. A path that persistently fails to materialize
//! routes only its own documents to the fallback folder; the batch continues.

use crate::classify::DocumentDescriptor;
use crate::pipeline::RetryPolicy;
use crate::remote::RemoteClient;
use crate::Result;
use std::collections::HashMap;

/// Ordered taxonomy segments identifying one remote folder uniquely.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderPath {
    segments: Vec<String>,
}

impl FolderPath {
    /// Builds the four-segment path for a classified document.
    pub fn for_descriptor(root: &str, descriptor: &DocumentDescriptor) -> Self {
        let year_segment = match descriptor.inferred_year {
            Some(year) => year.to_string(),
            None => "UNDATED".to_string(),
        };
        Self {
            segments: vec![
                root.to_string(),
                descriptor.inferred_category.folder_segment().to_string(),
                descriptor.inferred_type.folder_segment().to_string(),
                year_segment,
            ],
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Cache key, e.g. `LEGISLACOES/ATOS_DELIBERATIVOS/RESOLUCAO/2025`.
    pub fn key(&self) -> String {
        self.segments.join("/")
    }
}

/// Where one document should be uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FolderAssignment {
    pub folder_id: u64,
    /// True when the taxonomy folder could not be created and the document
    /// was routed to the fallback folder instead
    pub is_fallback: bool,
}

/// Result of materializing the folder tree for a batch of documents.
#[derive(Debug)]
pub struct PlanOutcome {
    /// One assignment per input descriptor, in input order
    pub assignments: Vec<FolderAssignment>,
    pub folders_created: u64,
    /// Paths that persistently failed and fell back
    pub failed_paths: Vec<String>,
}

/// Materializes taxonomy paths against the remote platform, deduplicating
/// through a path-to-id cache that lives for the whole run.
pub struct FolderPlanner<'a, C: RemoteClient> {
    client: &'a C,
    retry: RetryPolicy,
    root_parent_id: u64,
    fallback_id: u64,
    cache: HashMap<String, u64>,
    created: u64,
}

impl<'a, C: RemoteClient> FolderPlanner<'a, C> {
    pub fn new(client: &'a C, retry: RetryPolicy, root_parent_id: u64, fallback_id: u64) -> Self {
        Self {
            client,
            retry,
            root_parent_id,
            fallback_id,
            cache: HashMap::new(),
            created: 0,
        }
    }

    /// Ensures every distinct path exists remotely and maps each descriptor
    /// to its folder id. A warm cache performs zero remote creates.
    pub async fn plan_and_materialize(
        &mut self,
        root: &str,
        descriptors: &[DocumentDescriptor],
    ) -> PlanOutcome {
        let paths: Vec<FolderPath> = descriptors
            .iter()
            .map(|d| FolderPath::for_descriptor(root, d))
            .collect();

        // Dedup before touching the network; shared paths are created once.
        let mut resolved: HashMap<String, Option<u64>> = HashMap::new();
        let mut failed_paths = Vec::new();
        for path in &paths {
            let key = path.key();
            if resolved.contains_key(&key) {
                continue;
            }
            match self.ensure_path(path).await {
                Ok(id) => {
                    resolved.insert(key, Some(id));
                }
                Err(e) => {
                    tracing::warn!(
                        "Folder path {} failed to materialize, using fallback: {}",
                        key,
                        e
                    );
                    failed_paths.push(key.clone());
                    resolved.insert(key, None);
                }
            }
        }

        let assignments = paths
            .iter()
            .map(|path| match resolved.get(&path.key()) {
                Some(Some(id)) => FolderAssignment {
                    folder_id: *id,
                    is_fallback: false,
                },
                _ => FolderAssignment {
                    folder_id: self.fallback_id,
                    is_fallback: true,
                },
            })
            .collect();

        PlanOutcome {
            assignments,
            folders_created: self.created,
            failed_paths,
        }
    }

    /// Walks the path segments, reusing cached ids and creating missing
    /// folders parent-first. Each create is wrapped in the retry policy.
    async fn ensure_path(&mut self, path: &FolderPath) -> Result<u64> {
        let client = self.client;
        let retry = self.retry.clone();

        let mut parent = self.root_parent_id;
        let mut key = String::new();

        for segment in path.segments() {
            if !key.is_empty() {
                key.push('/');
            }
            key.push_str(segment);

            if let Some(&id) = self.cache.get(&key) {
                parent = id;
                continue;
            }

            let id = retry
                .execute(|| client.create_folder(parent, segment))
                .await?;
            tracing::info!("Created folder {} (id {})", key, id);
            self.cache.insert(key.clone(), id);
            self.created += 1;
            parent = id;
        }

        Ok(parent)
    }
}
