//! Collaborator traits and per-URL error types
//!
//! The engine never talks to the network or parses markup itself. It asks a
//! [`Downloader`] for a [`Document`] and asks the document for its links.

use crate::UrlError;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while downloading a single page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Download of {url} did not complete")]
    Interrupted { url: String },

    #[error("{0}")]
    Other(String),
}

/// Errors raised while extracting links from a downloaded page
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid base URL: {0}")]
    InvalidBase(String),

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("{0}")]
    Other(String),
}

/// Reason a URL ended up in [`super::CrawlResult::errors`]
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Malformed URL: {0}")]
    Malformed(#[from] UrlError),

    #[error("Download failed: {0}")]
    Fetch(#[from] FetchError),
}

/// A downloaded page that can enumerate its outgoing links
pub trait Document: Send + Sync {
    /// Returns the absolute URLs this page links to
    fn links(&self) -> Result<Vec<String>, ExtractError>;
}

/// Turns a URL into a [`Document`]
///
/// Implementations are shared by every download worker, so they must be
/// `Send + Sync`.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<Box<dyn Document>, FetchError>;
}
