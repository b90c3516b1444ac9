//! Shared crawl state and the final result
//!
//! [`CrawlState`] is written to by every download and extraction worker at
//! once; all containers are `dashmap` sharded maps so callers never lock.

use crate::crawler::traits::{CrawlError, ExtractError};
use dashmap::{DashMap, DashSet};
use std::collections::HashMap;

/// Concurrent bookkeeping for one crawl invocation
#[derive(Debug, Default)]
pub struct CrawlState {
    downloaded: DashSet<String>,
    errors: DashMap<String, CrawlError>,
    extraction_failures: DashMap<String, ExtractError>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful download; returns false if it was already recorded
    pub fn mark_downloaded(&self, url: &str) -> bool {
        self.downloaded.insert(url.to_string())
    }

    /// Records why `url` could not be downloaded
    pub fn record_error(&self, url: &str, error: CrawlError) {
        self.errors.insert(url.to_string(), error);
    }

    /// Records that a downloaded page failed to yield links
    pub fn record_extraction_failure(&self, url: &str, error: ExtractError) {
        self.extraction_failures.insert(url.to_string(), error);
    }

    pub fn is_downloaded(&self, url: &str) -> bool {
        self.downloaded.contains(url)
    }

    pub fn has_error(&self, url: &str) -> bool {
        self.errors.contains_key(url)
    }

    /// Returns true if `url` already has an outcome in this crawl
    pub fn is_settled(&self, url: &str) -> bool {
        self.is_downloaded(url) || self.has_error(url)
    }

    /// Moves the recorded outcomes into a [`CrawlResult`]
    ///
    /// `downloaded` carries the download order chosen by the caller; the
    /// error maps are drained out of the shared state.
    pub fn take_result(&self, downloaded: Vec<String>) -> CrawlResult {
        CrawlResult {
            downloaded,
            errors: drain(&self.errors),
            extraction_failures: drain(&self.extraction_failures),
        }
    }
}

fn drain<V>(map: &DashMap<String, V>) -> HashMap<String, V> {
    let keys: Vec<String> = map.iter().map(|entry| entry.key().clone()).collect();
    keys.into_iter().filter_map(|key| map.remove(&key)).collect()
}

/// Outcome of a crawl
///
/// A URL appears in at most one of `downloaded` and `errors`, and at most
/// once in either.
#[derive(Debug, Default)]
pub struct CrawlResult {
    /// Successfully downloaded URLs, level by level, sorted within a level
    pub downloaded: Vec<String>,

    /// URLs that could not be downloaded, with the reason
    pub errors: HashMap<String, CrawlError>,

    /// Downloaded pages whose links could not be extracted
    pub extraction_failures: HashMap<String, ExtractError>,
}

impl CrawlResult {
    pub fn is_downloaded(&self, url: &str) -> bool {
        self.downloaded.iter().any(|downloaded| downloaded == url)
    }

    pub fn error_for(&self, url: &str) -> Option<&CrawlError> {
        self.errors.get(url)
    }

    /// Pages that were attempted, successfully or not
    pub fn total_pages(&self) -> usize {
        self.downloaded.len() + self.errors.len()
    }

    /// Percentage of attempted pages that downloaded
    pub fn success_rate(&self) -> f64 {
        if self.total_pages() == 0 {
            0.0
        } else {
            self.downloaded.len() as f64 / self.total_pages() as f64 * 100.0
        }
    }
}
