//! HTTP downloader implementation
//!
//! This module provides the network side of the crawler:
//! - Building HTTP clients with the configured user agent and timeouts
//! - GET requests that follow redirects
//! - Classifying failures into [`FetchError`]
//!
//! Pages that are not HTML still count as downloaded, they just have no
//! links.

use crate::config::{HttpConfig, UserAgentConfig};
use crate::crawler::parser::HtmlDocument;
use crate::crawler::traits::{Document, Downloader, FetchError};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - Identification sent with every request
/// * `http` - Request and connect timeouts
///
/// # Example
///
/// ```no_run
/// use strata_crawler::config::{HttpConfig, UserAgentConfig};
/// use strata_crawler::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    http: &HttpConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(http.request_timeout_secs))
        .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Downloader`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(user_agent: &UserAgentConfig, http: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(user_agent, http)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    /// Fetches a URL
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx, HTML | Document with the page's links |
    /// | 2xx, other content | Document without links |
    /// | Any other status | `FetchError::Status` |
    /// | Timeout | `FetchError::Timeout` |
    /// | Connection / TLS / body error | `FetchError::Http` |
    async fn download(&self, url: &str) -> Result<Box<dyn Document>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html(&content_type) {
            tracing::debug!("{} is {}, not following links", url, content_type);
            return Ok(Box::new(HtmlDocument::new(final_url, String::new())));
        }

        let body = response.text().await.map_err(|e| classify_error(url, e))?;
        Ok(Box::new(HtmlDocument::new(final_url, body)))
    }
}

/// Missing Content-Type is treated as HTML
fn is_html(content_type: &str) -> bool {
    content_type.is_empty() || content_type.to_ascii_lowercase().contains("html")
}

fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
