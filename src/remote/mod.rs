//! Remote content platform client
//!
//! The platform is an external collaborator exposing folder, document, and
//! structured-content creation over REST. [`RemoteClient`] is the seam the
//! planner and orchestrator program against; the HTTP implementation lives in
//! [`http`], and [`DryRunClient`] backs `--test` runs and unit tests. Every
//! call is assumed idempotent-unsafe: a duplicate create makes a duplicate
//! remote entity, which is why the folder planner's dedup cache exists.

mod http;

pub use http::HttpRemoteClient;

use crate::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// A folder as known to the remote platform.
#[derive(Debug, Clone)]
pub struct RemoteFolder {
    pub id: u64,
    pub name: String,
    pub parent_id: Option<u64>,
}

/// Fields of a structured-content entry (the platform's article shape).
#[derive(Debug, Clone)]
pub struct ContentFields {
    /// Document id of the already-uploaded cover image, if any
    pub cover_image_id: Option<u64>,
    pub content_html: String,
}

/// Operations mural needs from the content platform.
#[allow(async_fn_in_trait)]
pub trait RemoteClient {
    async fn create_folder(&self, parent_id: u64, name: &str) -> Result<u64>;

    async fn upload_document(&self, folder_id: u64, bytes: Vec<u8>, filename: &str) -> Result<u64>;

    async fn create_structured_content(
        &self,
        folder_id: u64,
        structure_id: u64,
        title: &str,
        fields: &ContentFields,
    ) -> Result<u64>;

    /// Cheap read used as the startup health probe.
    async fn list_folders(&self, parent_id: u64) -> Result<Vec<RemoteFolder>>;
}

/// Records every would-be write without touching the network.
///
/// Ids are handed out from a private counter so downstream code sees a
/// realistic mapping.
#[derive(Debug, Default)]
pub struct DryRunClient {
    next_id: AtomicU64,
    created_folders: Mutex<Vec<(u64, String)>>,
    uploads: Mutex<Vec<(u64, String)>>,
    contents: Mutex<Vec<(u64, String, Option<u64>)>>,
}

impl DryRunClient {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1000),
            ..Default::default()
        }
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn created_folders(&self) -> Vec<(u64, String)> {
        self.created_folders.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<(u64, String)> {
        self.uploads.lock().unwrap().clone()
    }

    /// Recorded structured-content creates: folder id, title, cover image id.
    pub fn contents(&self) -> Vec<(u64, String, Option<u64>)> {
        self.contents.lock().unwrap().clone()
    }
}

impl RemoteClient for DryRunClient {
    async fn create_folder(&self, parent_id: u64, name: &str) -> Result<u64> {
        let id = self.allocate_id();
        tracing::info!("[dry-run] would create folder '{}' under {}", name, parent_id);
        self.created_folders
            .lock()
            .unwrap()
            .push((parent_id, name.to_string()));
        Ok(id)
    }

    async fn upload_document(
        &self,
        folder_id: u64,
        _bytes: Vec<u8>,
        filename: &str,
    ) -> Result<u64> {
        let id = self.allocate_id();
        tracing::info!("[dry-run] would upload '{}' to folder {}", filename, folder_id);
        self.uploads
            .lock()
            .unwrap()
            .push((folder_id, filename.to_string()));
        Ok(id)
    }

    async fn create_structured_content(
        &self,
        folder_id: u64,
        _structure_id: u64,
        title: &str,
        fields: &ContentFields,
    ) -> Result<u64> {
        let id = self.allocate_id();
        tracing::info!(
            "[dry-run] would create structured content '{}' in folder {}",
            title,
            folder_id
        );
        self.contents
            .lock()
            .unwrap()
            .push((folder_id, title.to_string(), fields.cover_image_id));
        Ok(id)
    }

    async fn list_folders(&self, _parent_id: u64) -> Result<Vec<RemoteFolder>> {
        Ok(Vec::new())
    }
}
