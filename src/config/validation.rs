use crate::config::types::Config;
use crate::ConfigError;
use url::Url;

/// Validates a parsed configuration before any work starts.
///
/// Every rule here guards an invariant a component relies on; a config that
/// passes validation never aborts a run mid-flight for reasons that were
/// knowable up front.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.pipeline.concurrency == 0 {
        return Err(ConfigError::Validation(
            "pipeline.concurrency must be at least 1".to_string(),
        ));
    }

    if config.pipeline.batch_size == 0 {
        return Err(ConfigError::Validation(
            "pipeline.batch-size must be at least 1".to_string(),
        ));
    }

    if config.pipeline.save_interval == 0 {
        return Err(ConfigError::Validation(
            "pipeline.save-interval must be at least 1".to_string(),
        ));
    }

    if config.pipeline.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "pipeline.timeout-secs must be at least 1".to_string(),
        ));
    }

    if config.pipeline.dev_mode && config.pipeline.max_dev_items == 0 {
        return Err(ConfigError::Validation(
            "pipeline.max-dev-items must be at least 1 when dev-mode is on".to_string(),
        ));
    }

    if config.source.start_page == 0 || config.source.end_page < config.source.start_page {
        return Err(ConfigError::Validation(
            "source.start-page must be >= 1 and <= source.end-page".to_string(),
        ));
    }

    validate_url(&config.source.base_url)?;
    validate_url(&config.remote.base_url)?;

    if config.remote.username.is_empty() || config.remote.password.is_empty() {
        return Err(ConfigError::Validation(
            "remote.username and remote.password are required".to_string(),
        ));
    }

    if config.remote.taxonomy_root.trim().is_empty() {
        return Err(ConfigError::Validation(
            "remote.taxonomy-root must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|_| ConfigError::InvalidUrl(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(ConfigError::InvalidUrl(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{OutputConfig, PipelineConfig, RemoteConfig, SourceConfig};

    fn valid_config() -> Config {
        Config {
            pipeline: PipelineConfig {
                concurrency: 4,
                delay_between_requests_ms: 300,
                max_retries: 3,
                timeout_secs: 20,
                batch_size: 30,
                save_interval: 5,
                dev_mode: false,
                max_dev_items: 3,
            },
            source: SourceConfig {
                base_url: "https://portal.example.org/".to_string(),
                listing_path: "noticias/".to_string(),
                start_page: 1,
                end_page: 50,
                user_agent: "mural/1.0".to_string(),
            },
            remote: RemoteConfig {
                base_url: "https://cms.example.org".to_string(),
                site_id: 20121,
                username: "svc".to_string(),
                password: "secret".to_string(),
                root_folder_id: 100,
                fallback_folder_id: 999,
                structure_id: 40101,
                taxonomy_root: "LEGISLACOES".to_string(),
                timeout_secs: 30,
            },
            output: OutputConfig {
                urls_file: "urls.txt".to_string(),
                checkpoint_path: "checkpoint.json".to_string(),
                results_path: "articles.json".to_string(),
            },
        }
    }

    #[test]
    fn accepts_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn rejects_zero_concurrency() {
        let mut config = valid_config();
        config.pipeline.concurrency = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn rejects_zero_save_interval() {
        let mut config = valid_config();
        config.pipeline.save_interval = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_dev_mode_without_cap() {
        let mut config = valid_config();
        config.pipeline.dev_mode = true;
        config.pipeline.max_dev_items = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_non_http_url() {
        let mut config = valid_config();
        config.remote.base_url = "ftp://cms.example.org".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn rejects_missing_credentials() {
        let mut config = valid_config();
        config.remote.password.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_inverted_page_range() {
        let mut config = valid_config();
        config.source.start_page = 10;
        config.source.end_page = 2;
        assert!(validate(&config).is_err());
    }
}
