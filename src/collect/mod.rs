//! URL collection from the portal's paginated news listing
//!
//! Walks listing pages, extracts article links, dedups them, and persists the
//! sorted set to the urls file consumed by the scrape run. Per-page failures
//! are logged and skipped; collection never aborts on one bad page.

use crate::config::SourceConfig;
use crate::pipeline::RateLimiter;
use crate::{MuralError, Result};
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::path::Path;
use url::Url;

const POST_LINK_SELECTOR: &str = ".elementor-post__title a";

/// Extracts article links from one listing page. Pure over the markup.
pub fn extract_post_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(POST_LINK_SELECTOR) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .map(|u| u.to_string())
        .collect()
}

/// Collects article URLs from the configured listing page range.
///
/// Returns the deduplicated set in sorted order. The page-1 URL has no page
/// suffix; later pages append `N/`.
pub async fn collect_listing_urls(client: &Client, source: &SourceConfig) -> Result<Vec<String>> {
    let base = Url::parse(&source.base_url)?;
    let listing = base.join(&source.listing_path)?;
    let mut limiter = RateLimiter::new(std::time::Duration::from_millis(500));
    let mut collected: BTreeSet<String> = BTreeSet::new();

    for page in source.start_page..=source.end_page {
        let page_url = if page == 1 {
            listing.clone()
        } else {
            listing.join(&format!("{page}/"))?
        };

        limiter.acquire().await;
        tracing::info!("Collecting listing page {} of {}", page, source.end_page);

        let body = match fetch_listing(client, page_url.as_str()).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Skipping listing page {}: {}", page, e);
                continue;
            }
        };

        let links = extract_post_links(&body, &page_url);
        let before = collected.len();
        collected.extend(links);
        tracing::debug!(
            "Page {}: {} new URLs ({} total)",
            page,
            collected.len() - before,
            collected.len()
        );
    }

    Ok(collected.into_iter().collect())
}

async fn fetch_listing(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await.map_err(|e| MuralError::Network {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(MuralError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response
        .text()
        .await
        .map_err(|e| MuralError::Network {
            url: url.to_string(),
            message: e.to_string(),
        })
}

/// Loads one URL per non-empty line.
pub fn load_urls(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Writes one URL per line.
pub fn save_urls(path: &Path, urls: &[String]) -> Result<()> {
    let mut content = urls.join("\n");
    content.push('\n');
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn extracts_listing_links() {
        let html = r#"<html><body>
            <h3 class="elementor-post__title"><a href="/noticias/abc/">A</a></h3>
            <h3 class="elementor-post__title"><a href="https://portal.example.org/noticias/def/">B</a></h3>
            <a href="/outros/">not a post</a>
            </body></html>"#;
        let base = Url::parse("https://portal.example.org/noticias/").unwrap();
        let links = extract_post_links(html, &base);
        assert_eq!(
            links,
            vec![
                "https://portal.example.org/noticias/abc/",
                "https://portal.example.org/noticias/def/",
            ]
        );
    }

    #[test]
    fn ignores_mailto_and_invalid_links() {
        let html = r#"<h3 class="elementor-post__title"><a href="mailto:x@y.z">Mail</a></h3>"#;
        let base = Url::parse("https://portal.example.org/").unwrap();
        assert!(extract_post_links(html, &base).is_empty());
    }

    #[test]
    fn urls_file_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let urls = vec![
            "https://portal.example.org/noticias/a/".to_string(),
            "https://portal.example.org/noticias/b/".to_string(),
        ];
        save_urls(file.path(), &urls).unwrap();
        let loaded = load_urls(file.path()).unwrap();
        assert_eq!(loaded, urls);
    }

    #[test]
    fn load_skips_blank_lines() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "https://a.example/\n\n  \nhttps://b.example/\n").unwrap();
        let loaded = load_urls(file.path()).unwrap();
        assert_eq!(loaded.len(), 2);
    }
}
