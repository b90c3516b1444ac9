//! HTML document and link extraction
//!
//! [`HtmlDocument`] keeps the raw markup and its final URL and only parses
//! when links are requested, so the document can move freely between the
//! download and extraction pools.

use crate::crawler::traits::{Document, ExtractError};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// A downloaded HTML page
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    base_url: String,
    html: String,
}

impl HtmlDocument {
    /// Wraps markup fetched from `base_url` (the URL after redirects)
    pub fn new(base_url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            html: html.into(),
        }
    }
}

impl Document for HtmlDocument {
    fn links(&self) -> Result<Vec<String>, ExtractError> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|e| ExtractError::InvalidBase(format!("{}: {}", self.base_url, e)))?;
        extract_links(&self.html, &base_url)
    }
}

/// Extracts absolute links from HTML content
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Fragment-only links
/// - Anything that does not resolve to HTTP(S)
///
/// Fragments are stripped from the resolved URLs; links are returned in
/// document order without duplicates.
///
/// # Example
///
/// ```
/// use strata_crawler::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<a href="/page">Link</a><a href="mailto:me@example.com">Mail</a>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let links = extract_links(html, &base_url).unwrap();
/// assert_eq!(links, vec!["https://example.com/page"]);
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Result<Vec<String>, ExtractError> {
    let document = Html::parse_document(html);
    let mut links: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let anchors = selector("a[href]")?;
    let canonical = selector("link[rel='canonical'][href]")?;

    let hrefs = document
        .select(&anchors)
        .filter(|element| element.value().attr("download").is_none())
        .chain(document.select(&canonical))
        .filter_map(|element| element.value().attr("href"));

    for href in hrefs {
        if let Some(absolute_url) = resolve_link(href, base_url) {
            if seen.insert(absolute_url.clone()) {
                links.push(absolute_url);
            }
        }
    }

    Ok(links)
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Other(format!("bad selector {}: {:?}", css, e)))
}

/// Resolves a link href to an absolute HTTP(S) URL without fragment
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }
    absolute_url.set_fragment(None);
    Some(absolute_url.to_string())
}
