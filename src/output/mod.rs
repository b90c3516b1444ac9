//! Output module for presenting crawl results
//!
//! This module handles:
//! - Printing a result listing to the console
//! - Generating markdown reports of a crawl

mod markdown;

pub use markdown::{format_markdown_report, write_markdown_report};

use crate::crawler::CrawlResult;
use chrono::{DateTime, Utc};
use std::io::{self, Write};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A finished crawl together with its run metadata
#[derive(Debug)]
pub struct CrawlReport<'a> {
    pub start_url: &'a str,
    pub depth: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub result: &'a CrawlResult,
}

impl<'a> CrawlReport<'a> {
    pub fn new(
        start_url: &'a str,
        depth: u32,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        result: &'a CrawlResult,
    ) -> Self {
        Self {
            start_url,
            depth,
            started_at,
            finished_at,
            result,
        }
    }

    /// Wall-clock duration of the crawl in seconds
    pub fn duration_seconds(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Prints downloaded pages and failures to stdout
pub fn print_result(result: &CrawlResult) -> OutputResult<()> {
    let stdout = io::stdout();
    write_result(&mut stdout.lock(), result)
}

/// Writes the console listing of a result
///
/// Errors are listed sorted by URL so the output is stable.
pub fn write_result(out: &mut impl Write, result: &CrawlResult) -> OutputResult<()> {
    writeln!(out, "Successfully downloaded pages:")?;
    for url in &result.downloaded {
        writeln!(out, "{}", url)?;
    }

    writeln!(out, "Pages downloaded with errors:")?;
    let mut errors: Vec<_> = result.errors.iter().collect();
    errors.sort_by(|a, b| a.0.cmp(b.0));
    for (url, error) in errors {
        writeln!(out, "Page: {}, error: {}", url, error)?;
    }

    Ok(())
}
