//! Strata: a breadth-first web crawler engine
//!
//! This crate crawls a site level by level from a start URL, bounding the
//! number of simultaneous downloads and extractions globally and the number
//! of simultaneous downloads per host.

pub mod config;
pub mod crawler;
pub mod output;
pub mod url;

use thiserror::Error;

/// Errors raised when constructing a [`WebCrawler`]
///
/// Per-URL failures never surface here; they are collected in
/// [`crawler::CrawlResult`].
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Runtime error: {0}")]
    Runtime(String),
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

    #[error("Invalid host pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL '{0}'")]
    Parse(String),

    #[error("Missing host in URL '{0}'")]
    MissingHost(String),
}

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{
    CrawlError, CrawlResult, Document, Downloader, ExtractError, FetchError, WebCrawler,
};
pub use crate::url::{host_of, PermittedHosts};
