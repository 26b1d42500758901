//! Mural: a portal content migration pipeline
//!
//! This crate extracts news articles and legal documents from a public web
//! portal and republishes them into a remote content platform, with rate
//! limiting, bounded retries, resumable checkpoints, and rule-based
//! classification of documents into a folder taxonomy.

pub mod checkpoint;
pub mod classify;
pub mod collect;
pub mod config;
pub mod extract;
pub mod folders;
pub mod migrate;
pub mod pipeline;
pub mod remote;
pub mod report;

use thiserror::Error;

/// Main error type for mural operations
#[derive(Debug, Error)]
pub enum MuralError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Remote API error (HTTP {status}): {message}")]
    RemoteApi { status: u16, message: String },

    #[error("Remote platform unreachable: {0}")]
    RemoteUnreachable(String),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error categories used for retry decisions and run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transient transport failure (timeout, reset, 5xx)
    Network,
    /// Malformed or unexpected markup; retrying cannot help
    Parse,
    /// Remote platform rejected or failed a call
    RemoteApi,
    /// Invalid or missing configuration; fatal before any work starts
    Config,
    /// Local filesystem or serialization failure
    Local,
}

impl MuralError {
    /// Returns true if retrying the failed operation can plausibly succeed.
    ///
    /// Network timeouts, connection resets, and 5xx-class remote errors are
    /// retryable. Parse errors, 4xx-class remote errors, and configuration
    /// errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::RemoteApi { status, .. } => *status >= 500,
            Self::RemoteUnreachable(_) => true,
            Self::Reqwest(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Categorizes this error for run statistics.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } | Self::Timeout { .. } | Self::Http { .. } => ErrorKind::Network,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::RemoteApi { .. } | Self::RemoteUnreachable(_) => ErrorKind::RemoteApi,
            Self::Config(_) => ErrorKind::Config,
            Self::Reqwest(_) => ErrorKind::Network,
            Self::UrlParse(_) => ErrorKind::Parse,
            Self::Checkpoint(_) | Self::Json(_) | Self::Io(_) => ErrorKind::Local,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for mural operations
pub type Result<T> = std::result::Result<T, MuralError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use classify::{classify, DocumentCategory, DocumentDescriptor, DocumentType};
pub use config::Config;
pub use extract::{ArticleRecord, ImageData};
pub use pipeline::{RateLimiter, RetryPolicy, WorkerPool};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_are_retryable() {
        let err = MuralError::Network {
            url: "https://example.com/a".into(),
            message: "connection reset".into(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[test]
    fn parse_errors_are_not_retryable() {
        let err = MuralError::Parse {
            url: "https://example.com/a".into(),
            message: "missing content container".into(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn remote_api_retryable_only_for_server_errors() {
        let server = MuralError::RemoteApi {
            status: 503,
            message: "unavailable".into(),
        };
        let client = MuralError::RemoteApi {
            status: 403,
            message: "forbidden".into(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
    }
}
