use crate::{UrlError, UrlResult};
use url::Url;

/// Resolves the host of a URL
///
/// The URL is parsed as-is and its host is returned lowercased. A URL that
/// does not parse, or that has no host (`mailto:`, `data:`, ...), is
/// malformed for crawling purposes.
///
/// # Examples
///
/// ```
/// use strata_crawler::url::host_of;
///
/// assert_eq!(host_of("https://Example.COM:8080/path").unwrap(), "example.com");
/// assert!(host_of("not a url").is_err());
/// assert!(host_of("mailto:someone@example.com").is_err());
/// ```
pub fn host_of(url: &str) -> UrlResult<String> {
    let parsed = Url::parse(url).map_err(|_| UrlError::Parse(url.to_string()))?;

    parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .map(|host| host.to_lowercase())
        .ok_or_else(|| UrlError::MissingHost(url.to_string()))
}
