//! End-to-end run orchestration
//!
//! Drives the four run modes: collecting listing URLs, scraping articles
//! through the worker pool with checkpointed resume, migrating documents into
//! the remote folder taxonomy, and offline analysis of the classification.
//! Per-item failures are counted and reported; only setup failures (bad
//! config, unreachable remote platform) abort a run.

use crate::checkpoint::Checkpointer;
use crate::classify::{classify_url, DocumentDescriptor};
use crate::collect::{collect_listing_urls, load_urls, save_urls};
use crate::config::Config;
use crate::extract::ArticleRecord;
use crate::folders::{FolderPath, FolderPlanner};
use crate::pipeline::{build_http_client, RetryPolicy, WorkItem, WorkerPool};
use crate::remote::{ContentFields, RemoteClient};
use crate::report::{print_report, RunStatistics};
use crate::{MuralError, Result};
use reqwest::Client;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle of one run, reported in logs as it progresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    CollectingUrls,
    Fetching,
    Checkpointing,
    Classifying,
    Planning,
    Uploading,
    Reporting,
    Done,
    /// Fatal setup failure; per-item errors never reach this state
    Failed(String),
}

/// Owns one run from start to finish.
pub struct MigrationOrchestrator {
    config: Config,
    stop: Arc<AtomicBool>,
    phase: RunPhase,
}

impl MigrationOrchestrator {
    pub fn new(config: Config, stop: Arc<AtomicBool>) -> Self {
        Self {
            config,
            stop,
            phase: RunPhase::Idle,
        }
    }

    pub fn phase(&self) -> &RunPhase {
        &self.phase
    }

    fn enter(&mut self, phase: RunPhase) {
        tracing::info!("Entering phase {:?}", phase);
        self.phase = phase;
    }

    fn fail(&mut self, error: MuralError) -> MuralError {
        self.phase = RunPhase::Failed(error.to_string());
        error
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Paginates the portal's listing pages and persists the discovered
    /// article URLs, one per line.
    pub async fn collect(&mut self) -> Result<usize> {
        self.enter(RunPhase::CollectingUrls);

        let client = build_http_client(
            &self.config.source.user_agent,
            self.config.pipeline.request_timeout(),
        )
        .map_err(|e| self.fail(e.into()))?;

        let urls = match collect_listing_urls(&client, &self.config.source).await {
            Ok(urls) => urls,
            Err(e) => return Err(self.fail(e)),
        };
        save_urls(Path::new(&self.config.output.urls_file), &urls)?;

        tracing::info!(
            "Collected {} article URLs into {}",
            urls.len(),
            self.config.output.urls_file
        );
        self.enter(RunPhase::Done);
        Ok(urls.len())
    }

    /// Fetches and extracts every pending article through the worker pool,
    /// checkpointing as it goes. Already-completed URLs are skipped, so an
    /// interrupted run resumes where it left off.
    pub async fn scrape(&mut self) -> Result<RunStatistics> {
        let pipeline = self.config.pipeline.clone();

        let urls = load_urls(Path::new(&self.config.output.urls_file))
            .map_err(|e| self.fail(e))?;
        let mut checkpointer = Checkpointer::open(
            self.config.output.checkpoint_path.clone(),
            pipeline.save_interval,
        )
        .map_err(|e| self.fail(e))?;

        let mut pending: Vec<String> = urls
            .into_iter()
            .filter(|url| !checkpointer.state().is_completed(url))
            .collect();
        if pipeline.dev_mode {
            // The dev cap wins over batch size: truncate before batching.
            pending.truncate(pipeline.max_dev_items);
            tracing::info!("Dev mode: capped run at {} items", pending.len());
        }
        tracing::info!("{} URLs pending after resume filter", pending.len());

        let client = build_http_client(&self.config.source.user_agent, pipeline.request_timeout())
            .map_err(|e| self.fail(e.into()))?;
        let pool = WorkerPool::new(
            client,
            pipeline.concurrency as usize,
            pipeline.request_delay(),
            RetryPolicy::new(pipeline.max_retries),
        )
        .with_stop_signal(self.stop.clone());

        self.enter(RunPhase::Fetching);
        let mut stats = RunStatistics::new();
        for (batch_index, batch) in pending.chunks(pipeline.batch_size).enumerate() {
            if self.stopped() {
                tracing::info!("Stop requested, halting before batch {}", batch_index + 1);
                break;
            }
            tracing::info!("Processing batch {} ({} items)", batch_index + 1, batch.len());

            let items: Vec<WorkItem> = batch
                .iter()
                .enumerate()
                .map(|(i, url)| {
                    WorkItem::new(url.clone(), url.clone(), batch_index * pipeline.batch_size + i)
                })
                .collect();

            let mut outcomes = pool.spawn(items);
            while let Some(outcome) = outcomes.recv().await {
                if let Err(e) = &outcome.result {
                    tracing::warn!(
                        "Failed after {} attempts: {} ({})",
                        outcome.item.attempt_count,
                        outcome.item.url,
                        e
                    );
                }
                stats.record_outcome(&outcome);
                checkpointer.append(&outcome)?;
            }
        }

        self.enter(RunPhase::Checkpointing);
        checkpointer.flush()?;
        let results = serde_json::to_string_pretty(&checkpointer.state().results)?;
        fs::write(&self.config.output.results_path, results)?;

        self.enter(RunPhase::Reporting);
        print_report("Scrape Run", &stats);
        self.enter(RunPhase::Done);
        Ok(stats)
    }

    /// Classifies every document URL, materializes the folder taxonomy, and
    /// uploads each document to its assigned folder. Articles previously
    /// scraped into the results file are republished as structured content.
    pub async fn migrate<C: RemoteClient>(&mut self, client: &C) -> Result<RunStatistics> {
        let remote = self.config.remote.clone();
        let retry = RetryPolicy::new(self.config.pipeline.max_retries);

        // Health probe: an unreachable platform is fatal before any work.
        if let Err(e) = client.list_folders(remote.root_folder_id).await {
            tracing::error!("Remote platform health check failed: {}", e);
            return Err(self.fail(e));
        }

        self.enter(RunPhase::Classifying);
        let urls = load_urls(Path::new(&self.config.output.urls_file))
            .map_err(|e| self.fail(e))?;
        let descriptors: Vec<DocumentDescriptor> =
            urls.iter().map(|url| classify_url(url)).collect();

        self.enter(RunPhase::Planning);
        let mut planner = FolderPlanner::new(
            client,
            retry.clone(),
            remote.root_folder_id,
            remote.fallback_folder_id,
        );
        let plan = planner
            .plan_and_materialize(&remote.taxonomy_root, &descriptors)
            .await;

        self.enter(RunPhase::Uploading);
        let http = build_http_client(
            &self.config.source.user_agent,
            self.config.pipeline.request_timeout(),
        )
        .map_err(|e| self.fail(e.into()))?;

        let mut stats = RunStatistics::new();
        stats.folders_created = plan.folders_created;

        for (descriptor, assignment) in descriptors.iter().zip(&plan.assignments) {
            if self.stopped() {
                tracing::info!("Stop requested, halting uploads");
                break;
            }

            let bytes = match retry
                .execute(|| download_document(&http, &descriptor.source_url))
                .await
            {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("Download failed: {} ({})", descriptor.source_url, e);
                    stats.record_failure(e.kind());
                    continue;
                }
            };

            match retry
                .execute(|| {
                    client.upload_document(
                        assignment.folder_id,
                        bytes.clone(),
                        &descriptor.sanitized_name,
                    )
                })
                .await
            {
                Ok(id) => {
                    tracing::info!(
                        "Uploaded {} to folder {} (id {})",
                        descriptor.sanitized_name,
                        assignment.folder_id,
                        id
                    );
                    stats.record_success();
                    stats.uploads += 1;
                    if assignment.is_fallback {
                        stats.fallback_uploads += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!("Upload failed: {} ({})", descriptor.sanitized_name, e);
                    stats.record_failure(e.kind());
                }
            }
        }

        if Path::new(&self.config.output.results_path).exists() && !self.stopped() {
            self.publish_articles(client, &http, &retry, &mut stats).await?;
        }

        self.enter(RunPhase::Reporting);
        print_report("Migration Run", &stats);
        self.enter(RunPhase::Done);
        Ok(stats)
    }

    /// Republishes scraped articles as structured content, one folder per
    /// article title. The article's featured image is uploaded into the same
    /// folder and linked as the cover; a missing or failed image never blocks
    /// the article itself.
    async fn publish_articles<C: RemoteClient>(
        &mut self,
        client: &C,
        http: &Client,
        retry: &RetryPolicy,
        stats: &mut RunStatistics,
    ) -> Result<()> {
        let remote = &self.config.remote;
        let raw = fs::read_to_string(&self.config.output.results_path)?;
        let records: Vec<ArticleRecord> = serde_json::from_str(&raw)?;
        tracing::info!("Publishing {} articles as structured content", records.len());

        for record in &records {
            if self.stopped() {
                break;
            }
            let title = record.title.clone().unwrap_or_else(|| record.url.clone());

            let folder_id = match retry
                .execute(|| client.create_folder(remote.root_folder_id, &title))
                .await
            {
                Ok(id) => {
                    stats.folders_created += 1;
                    id
                }
                Err(e) => {
                    tracing::warn!("Article folder failed for {}: {}", title, e);
                    stats.fallback_uploads += 1;
                    remote.fallback_folder_id
                }
            };

            let cover_image_id = match &record.featured_image_url {
                Some(image_url) => {
                    let id =
                        upload_cover_image(client, http, retry, folder_id, image_url).await;
                    if id.is_some() {
                        stats.uploads += 1;
                    }
                    id
                }
                None => None,
            };

            let fields = ContentFields {
                cover_image_id,
                content_html: record.content_html.clone(),
            };
            match retry
                .execute(|| {
                    client.create_structured_content(folder_id, remote.structure_id, &title, &fields)
                })
                .await
            {
                Ok(_) => stats.record_success(),
                Err(e) => {
                    tracing::warn!("Structured content failed for {}: {}", title, e);
                    stats.record_failure(e.kind());
                }
            }
        }
        Ok(())
    }

    /// Classifies every document URL and prints the resulting folder
    /// hierarchy and distribution without touching the remote platform.
    pub fn analyze(&mut self) -> Result<()> {
        self.enter(RunPhase::Classifying);
        let urls = load_urls(Path::new(&self.config.output.urls_file))
            .map_err(|e| self.fail(e))?;
        let descriptors: Vec<DocumentDescriptor> =
            urls.iter().map(|url| classify_url(url)).collect();

        let mut by_path: BTreeMap<String, u64> = BTreeMap::new();
        let mut by_type: BTreeMap<String, u64> = BTreeMap::new();
        for descriptor in &descriptors {
            let path = FolderPath::for_descriptor(&self.config.remote.taxonomy_root, descriptor);
            *by_path.entry(path.key()).or_insert(0) += 1;
            *by_type
                .entry(format!("{:?}", descriptor.inferred_type))
                .or_insert(0) += 1;
        }

        println!("=== Classification Preview ===\n");
        println!("Documents: {}", descriptors.len());
        println!();

        println!("Folder Hierarchy:");
        for (path, count) in &by_path {
            println!("  {} ({} documents)", path, count);
        }
        println!();

        println!("Distribution by Type:");
        for (kind, count) in &by_type {
            let percentage = if descriptors.is_empty() {
                0.0
            } else {
                (*count as f64 / descriptors.len() as f64) * 100.0
            };
            println!("  {}: {} ({:.1}%)", kind, count, percentage);
        }

        self.enter(RunPhase::Done);
        Ok(())
    }
}

/// Downloads an article's featured image and uploads it into the article's
/// folder, returning the remote document id for the cover field.
async fn upload_cover_image<C: RemoteClient>(
    client: &C,
    http: &Client,
    retry: &RetryPolicy,
    folder_id: u64,
    image_url: &str,
) -> Option<u64> {
    let bytes = match retry.execute(|| download_document(http, image_url)).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Cover image download failed: {} ({})", image_url, e);
            return None;
        }
    };

    let filename = image_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("cover-image.jpg");

    match retry
        .execute(|| client.upload_document(folder_id, bytes.clone(), filename))
        .await
    {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!("Cover image upload failed: {} ({})", filename, e);
            None
        }
    }
}

/// Downloads one document's bytes, mapping transport failures the same way
/// the page fetcher does.
async fn download_document(client: &Client, url: &str) -> Result<Vec<u8>> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            MuralError::Timeout {
                url: url.to_string(),
            }
        } else {
            MuralError::Network {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(MuralError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().await.map_err(|e| MuralError::Network {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputConfig, PipelineConfig, RemoteConfig, SourceConfig};
    use crate::remote::{DryRunClient, RemoteFolder};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(dir: &TempDir, server_url: &str) -> Config {
        Config {
            pipeline: PipelineConfig {
                concurrency: 2,
                delay_between_requests_ms: 0,
                max_retries: 1,
                timeout_secs: 5,
                batch_size: 10,
                save_interval: 5,
                dev_mode: false,
                max_dev_items: 3,
            },
            source: SourceConfig {
                base_url: server_url.to_string(),
                listing_path: "/noticias/".to_string(),
                start_page: 1,
                end_page: 1,
                user_agent: "mural-test/1.0".to_string(),
            },
            remote: RemoteConfig {
                base_url: server_url.to_string(),
                site_id: 1,
                username: "user".to_string(),
                password: "pass".to_string(),
                root_folder_id: 100,
                fallback_folder_id: 999,
                structure_id: 42,
                taxonomy_root: "LEGISLACOES".to_string(),
                timeout_secs: 5,
            },
            output: OutputConfig {
                urls_file: dir.path().join("urls.txt").display().to_string(),
                checkpoint_path: dir.path().join("checkpoint.json").display().to_string(),
                results_path: dir.path().join("results.json").display().to_string(),
            },
        }
    }

    fn stop_flag() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[tokio::test]
    async fn migrate_uploads_documents_into_taxonomy_folders() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs/Resolucao_001_2025.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/docs/Portaria_02_2024.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, &server.uri());
        fs::write(
            &config.output.urls_file,
            format!(
                "{}/docs/Resolucao_001_2025.pdf\n{}/docs/Portaria_02_2024.pdf\n",
                server.uri(),
                server.uri()
            ),
        )
        .unwrap();

        let client = DryRunClient::new();
        let mut orchestrator = MigrationOrchestrator::new(config, stop_flag());
        let stats = orchestrator.migrate(&client).await.unwrap();

        assert_eq!(stats.uploads, 2);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.fallback_uploads, 0);
        assert_eq!(client.uploads().len(), 2);
        // Two documents, two distinct paths, shared root segment
        assert!(stats.folders_created >= 7);
        assert_eq!(*orchestrator.phase(), RunPhase::Done);
    }

    #[tokio::test]
    async fn published_articles_link_an_uploaded_cover_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-content/uploads/2025/03/capa.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, &server.uri());
        fs::write(&config.output.urls_file, "").unwrap();

        let record = ArticleRecord {
            url: format!("{}/noticias/nova-unidade/", server.uri()),
            title: Some("Nova unidade".to_string()),
            author: None,
            date: None,
            featured_image_url: Some(format!(
                "{}/wp-content/uploads/2025/03/capa.jpg",
                server.uri()
            )),
            content_html: "<p>Texto.</p>".to_string(),
            content_images: Vec::new(),
        };
        fs::write(
            &config.output.results_path,
            serde_json::to_string(&vec![record]).unwrap(),
        )
        .unwrap();

        let client = DryRunClient::new();
        let mut orchestrator = MigrationOrchestrator::new(config, stop_flag());
        let stats = orchestrator.migrate(&client).await.unwrap();

        // The cover image was uploaded into the article's folder and its id
        // flowed into the content's image field
        let uploads = client.uploads();
        let contents = client.contents();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].1, "capa.jpg");
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].0, uploads[0].0);
        assert!(contents[0].2.is_some());
        assert_eq!(stats.uploads, 1);
        assert_eq!(stats.succeeded, 1);
    }

    #[tokio::test]
    async fn article_without_featured_image_publishes_without_a_cover() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, &server.uri());
        fs::write(&config.output.urls_file, "").unwrap();

        let record = ArticleRecord {
            url: format!("{}/noticias/sem-capa/", server.uri()),
            title: Some("Sem capa".to_string()),
            author: None,
            date: None,
            featured_image_url: None,
            content_html: "<p>Texto.</p>".to_string(),
            content_images: Vec::new(),
        };
        fs::write(
            &config.output.results_path,
            serde_json::to_string(&vec![record]).unwrap(),
        )
        .unwrap();

        let client = DryRunClient::new();
        let mut orchestrator = MigrationOrchestrator::new(config, stop_flag());
        let stats = orchestrator.migrate(&client).await.unwrap();

        assert!(client.uploads().is_empty());
        assert_eq!(client.contents().len(), 1);
        assert_eq!(client.contents()[0].2, None);
        assert_eq!(stats.succeeded, 1);
    }

    #[tokio::test]
    async fn migrate_fails_fast_when_remote_is_unreachable() {
        struct DownClient;
        impl RemoteClient for DownClient {
            async fn create_folder(&self, _: u64, _: &str) -> crate::Result<u64> {
                unreachable!()
            }
            async fn upload_document(&self, _: u64, _: Vec<u8>, _: &str) -> crate::Result<u64> {
                unreachable!()
            }
            async fn create_structured_content(
                &self,
                _: u64,
                _: u64,
                _: &str,
                _: &ContentFields,
            ) -> crate::Result<u64> {
                unreachable!()
            }
            async fn list_folders(&self, _: u64) -> crate::Result<Vec<RemoteFolder>> {
                Err(MuralError::RemoteUnreachable("connection refused".into()))
            }
        }

        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, "http://localhost:1");
        fs::write(&config.output.urls_file, "http://localhost:1/a.pdf\n").unwrap();

        let mut orchestrator = MigrationOrchestrator::new(config, stop_flag());
        let result = orchestrator.migrate(&DownClient).await;

        assert!(result.is_err());
        assert!(matches!(orchestrator.phase(), RunPhase::Failed(_)));
    }

    #[tokio::test]
    async fn scrape_skips_completed_urls_on_resume() {
        let server = MockServer::start().await;
        let article = r#"<html><body>
            <div class="elementor-section">
              <h1 class="elementor-heading-title">Nova unidade</h1>
              <div class="elementor-widget-theme-post-content"><p>Texto.</p></div>
            </div></body></html>"#;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(article))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, &server.uri());
        let done_url = format!("{}/noticias/antiga/", server.uri());
        let new_url = format!("{}/noticias/nova/", server.uri());
        fs::write(
            &config.output.urls_file,
            format!("{}\n{}\n", done_url, new_url),
        )
        .unwrap();

        // Seed a checkpoint marking the first URL completed
        let state = serde_json::json!({
            "completed_ids": [done_url],
            "results": [],
            "failures": {},
            "last_checkpoint_at": null
        });
        fs::write(&config.output.checkpoint_path, state.to_string()).unwrap();

        let mut orchestrator = MigrationOrchestrator::new(config, stop_flag());
        let stats = orchestrator.scrape().await.unwrap();

        assert_eq!(stats.attempted, 1);
        assert_eq!(stats.succeeded, 1);
    }

    #[tokio::test]
    async fn dev_mode_caps_the_item_list() {
        let server = MockServer::start().await;
        let article = r#"<html><body>
            <div class="elementor-section">
              <h1 class="elementor-heading-title">T</h1>
              <div class="elementor-widget-theme-post-content"><p>x</p></div>
            </div></body></html>"#;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(article))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir, &server.uri());
        config.pipeline.dev_mode = true;
        config.pipeline.max_dev_items = 2;
        let urls: Vec<String> = (0..6)
            .map(|i| format!("{}/noticias/{}/", server.uri(), i))
            .collect();
        fs::write(&config.output.urls_file, urls.join("\n")).unwrap();

        let mut orchestrator = MigrationOrchestrator::new(config, stop_flag());
        let stats = orchestrator.scrape().await.unwrap();

        assert_eq!(stats.attempted, 2);
    }
}
