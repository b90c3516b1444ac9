//! URL handling module
//!
//! This module provides host resolution for crawled URLs and the optional
//! permitted-host filter applied before a URL is admitted for download.

mod host;
mod matcher;

use std::collections::BTreeSet;

// Re-export main functions
pub use host::host_of;
pub use matcher::host_matches;

/// Set of host patterns a crawl is allowed to follow
///
/// Patterns are either exact host names or `*.`-prefixed wildcards. A URL
/// whose host matches no pattern is dropped silently by the crawler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermittedHosts {
    patterns: BTreeSet<String>,
}

impl PermittedHosts {
    /// Creates an empty set, which permits nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a host pattern to the set
    pub fn insert(&mut self, pattern: impl Into<String>) {
        self.patterns.insert(pattern.into().to_ascii_lowercase());
    }

    /// Returns true if `host` matches any pattern in the set
    pub fn permits(&self, host: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| host_matches(pattern, host))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterates over the stored patterns in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PermittedHosts {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut hosts = Self::new();
        for pattern in iter {
            hosts.insert(pattern);
        }
        hosts
    }
}
