use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for mural
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    pub remote: RemoteConfig,
    pub output: OutputConfig,
}

/// Pipeline behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of concurrent fetch workers
    pub concurrency: u32,

    /// Minimum time between requests issued by one worker (milliseconds)
    #[serde(rename = "delay-between-requests-ms")]
    pub delay_between_requests_ms: u64,

    /// Maximum retries after the initial attempt for transient failures
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Number of work items processed per batch
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Checkpoint flush cadence, in completed work items
    #[serde(rename = "save-interval")]
    pub save_interval: usize,

    /// Development mode: caps the total number of items processed
    #[serde(rename = "dev-mode", default)]
    pub dev_mode: bool,

    /// Item cap applied when dev mode is on
    #[serde(rename = "max-dev-items", default = "default_max_dev_items")]
    pub max_dev_items: usize,
}

fn default_max_dev_items() -> usize {
    3
}

impl PipelineConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.delay_between_requests_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Source portal configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the portal being scraped
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the paginated news listing, relative to the base URL
    #[serde(rename = "listing-path")]
    pub listing_path: String,

    /// First listing page to collect
    #[serde(rename = "start-page", default = "default_start_page")]
    pub start_page: u32,

    /// Last listing page to collect (inclusive)
    #[serde(rename = "end-page", default = "default_end_page")]
    pub end_page: u32,

    /// User agent sent with every outbound request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

fn default_start_page() -> u32 {
    1
}

fn default_end_page() -> u32 {
    50
}

/// Remote content platform configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the platform's REST API
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Site identifier on the platform
    #[serde(rename = "site-id")]
    pub site_id: u64,

    pub username: String,
    pub password: String,

    /// Parent folder under which the document taxonomy is created; 0 targets
    /// the site root
    #[serde(rename = "root-folder-id")]
    pub root_folder_id: u64,

    /// Folder receiving documents whose taxonomy folder could not be created
    #[serde(rename = "fallback-folder-id")]
    pub fallback_folder_id: u64,

    /// Structure id used when publishing articles as structured content
    #[serde(rename = "structure-id")]
    pub structure_id: u64,

    /// Name of the taxonomy root folder
    #[serde(rename = "taxonomy-root", default = "default_taxonomy_root")]
    pub taxonomy_root: String,

    /// Remote call timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_remote_timeout")]
    pub timeout_secs: u64,
}

fn default_taxonomy_root() -> String {
    "LEGISLACOES".to_string()
}

fn default_remote_timeout() -> u64 {
    30
}

/// Local file layout configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// File holding one source URL per line
    #[serde(rename = "urls-file")]
    pub urls_file: String,

    /// Checkpoint file path (atomically replaced on each flush)
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,

    /// Final scraped results (JSON)
    #[serde(rename = "results-path")]
    pub results_path: String,
}
