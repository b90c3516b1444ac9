//! Crawler module
//!
//! This module contains the crawl engine and its building blocks:
//! - Collaborator traits ([`Downloader`], [`Document`]) and per-URL errors
//! - Fixed-size worker pools for downloads and link extraction
//! - Per-host admission control
//! - The end-of-level barrier
//! - Shared crawl state and the final [`CrawlResult`]
//! - An HTTP downloader and HTML link extractor

mod barrier;
mod engine;
mod fetcher;
mod parser;
mod pool;
mod state;
mod throttle;
mod traits;

pub use barrier::{LevelBarrier, Registration};
pub use engine::WebCrawler;
pub use fetcher::{build_http_client, HttpDownloader};
pub use parser::{extract_links, HtmlDocument};
pub use pool::{Job, WorkerPool};
pub use state::{CrawlResult, CrawlState};
pub use throttle::HostThrottle;
pub use traits::{CrawlError, Document, Downloader, ExtractError, FetchError};
