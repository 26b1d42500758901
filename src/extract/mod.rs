//! HTML extraction: portal article pages to [`ArticleRecord`]
//!
//! A pure function over markup: the same HTML always yields the same record.
//! Selectors target the portal's elementor-based theme; the content container
//! is required, everything else degrades to `None`.

use crate::MuralError;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// One image inside an article body, in source document order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageData {
    pub src: String,
    #[serde(default)]
    pub alt: String,
    pub width: Option<String>,
    pub height: Option<String>,
    pub kind: ImageKind,
}

/// Whether an image sits inside a gallery block or stands alone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Individual,
    Gallery,
}

/// A successfully extracted article. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub url: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub featured_image_url: Option<String>,
    pub content_html: String,
    /// Preserves source document order
    pub content_images: Vec<ImageData>,
}

const TITLE_SELECTOR: &str = "h1.elementor-heading-title";
const AUTHOR_SELECTOR: &str = ".elementor-post-info__item--type-author";
const DATE_SELECTOR: &str = ".elementor-post-info__item--type-date time";
const CONTENT_SELECTOR: &str = ".elementor-widget-theme-post-content";
const CONTENT_FALLBACKS: &str = ".elementor-col-66, .elementor-section";
const CONTENT_ELEMENTS: &str = "p, ul, ol, blockquote, h2, h3, h4, h5, h6, figure";
const FEATURED_FALLBACK: &str = ".elementor-widget-image img";

/// Parses an article page into a record.
///
/// Fails with [`MuralError::Parse`] when the page has no recognizable content
/// container; parse failures are never retried.
pub fn parse_article(html: &str, url: &str) -> Result<ArticleRecord, MuralError> {
    let document = Html::parse_document(html);
    let base = Url::parse(url)?;

    let container = find_container(&document).ok_or_else(|| MuralError::Parse {
        url: url.to_string(),
        message: "missing content container".to_string(),
    })?;

    let content_images = extract_images(&container, &base);
    let content_html = extract_content_html(&container);

    Ok(ArticleRecord {
        url: url.to_string(),
        title: select_text(&document, TITLE_SELECTOR),
        author: select_text(&document, AUTHOR_SELECTOR),
        date: select_text(&document, DATE_SELECTOR),
        featured_image_url: extract_featured_image(&document, &base),
        content_html,
        content_images,
    })
}

fn find_container(document: &Html) -> Option<ElementRef<'_>> {
    for selector_str in [CONTENT_SELECTOR, CONTENT_FALLBACKS] {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                return Some(element);
            }
        }
    }
    None
}

fn select_text(document: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// The concatenated HTML of the article body elements, or the whole
/// container when no recognized elements are found.
fn extract_content_html(container: &ElementRef<'_>) -> String {
    if let Ok(selector) = Selector::parse(CONTENT_ELEMENTS) {
        let parts: Vec<String> = container.select(&selector).map(|el| el.html()).collect();
        if !parts.is_empty() {
            return parts.concat();
        }
    }
    container.html()
}

/// Content images in document order, restricted to uploaded media.
///
/// Theme chrome (logos, icons) shares the container with the article body;
/// only `wp-content/uploads` sources without a "logo" marker count.
fn extract_images(container: &ElementRef<'_>, base: &Url) -> Vec<ImageData> {
    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };

    container
        .select(&selector)
        .filter_map(|img| {
            let src = img.value().attr("src")?;
            if !src.contains("wp-content/uploads") || src.contains("logo") {
                return None;
            }
            let absolute = base.join(src).ok()?;
            Some(ImageData {
                src: absolute.to_string(),
                alt: img.value().attr("alt").unwrap_or_default().to_string(),
                width: img.value().attr("width").map(str::to_string),
                height: img.value().attr("height").map(str::to_string),
                kind: if in_gallery(&img) {
                    ImageKind::Gallery
                } else {
                    ImageKind::Individual
                },
            })
        })
        .collect()
}

fn in_gallery(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().classes().any(|c| c == "wp-block-gallery"))
}

/// Finds the article's lead image: the first uploaded image in the main
/// content column, falling back to the theme's image widget.
fn extract_featured_image(document: &Html, base: &Url) -> Option<String> {
    if let Ok(selector) = Selector::parse(CONTENT_FALLBACKS) {
        if let Some(area) = document.select(&selector).next() {
            if let Ok(img_selector) = Selector::parse("img") {
                for img in area.select(&img_selector) {
                    if let Some(src) = img.value().attr("src") {
                        if src.contains("wp-content/uploads")
                            && !src.contains("logo")
                            && !src.contains("icon")
                        {
                            return base.join(src).ok().map(|u| u.to_string());
                        }
                    }
                }
            }
        }
    }

    let selector = Selector::parse(FEATURED_FALLBACK).ok()?;
    let img = document.select(&selector).next()?;
    let src = img.value().attr("src")?;
    if src.contains("logo") {
        return None;
    }
    base.join(src).ok().map(|u| u.to_string())
}
