//! Markdown report generation
//!
//! This module renders a finished crawl as a human-readable markdown
//! document: run information, totals, downloaded pages and failures.

use crate::output::{CrawlReport, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown report to `output_path`
///
/// # Arguments
///
/// * `report` - The crawl and its metadata
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn write_markdown_report(report: &CrawlReport<'_>, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_report(report: &CrawlReport<'_>) -> String {
    let result = report.result;
    let mut md = String::new();

    md.push_str("# Crawl Report\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Start URL**: {}\n", report.start_url));
    md.push_str(&format!("- **Depth**: {}\n", report.depth));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n\n",
        report.duration_seconds()
    ));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Total Pages**: {}\n", result.total_pages()));
    md.push_str(&format!("- **Downloaded**: {}\n", result.downloaded.len()));
    md.push_str(&format!("- **Errors**: {}\n", result.errors.len()));
    md.push_str(&format!(
        "- **Extraction Failures**: {}\n",
        result.extraction_failures.len()
    ));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        result.success_rate()
    ));

    md.push_str("## Downloaded Pages\n\n");
    if result.downloaded.is_empty() {
        md.push_str("_None_\n\n");
    } else {
        for url in &result.downloaded {
            md.push_str(&format!("- {}\n", url));
        }
        md.push('\n');
    }

    if !result.errors.is_empty() {
        md.push_str("## Errors\n\n");
        md.push_str("| URL | Error |\n");
        md.push_str("|-----|-------|\n");
        let mut errors: Vec<_> = result.errors.iter().collect();
        errors.sort_by(|a, b| a.0.cmp(b.0));
        for (url, error) in errors {
            md.push_str(&format!("| {} | {} |\n", url, escape_cell(&error.to_string())));
        }
        md.push('\n');
    }

    if !result.extraction_failures.is_empty() {
        md.push_str("## Extraction Failures\n\n");
        md.push_str("Downloaded, but no links could be read from these pages.\n\n");
        let mut failures: Vec<_> = result.extraction_failures.iter().collect();
        failures.sort_by(|a, b| a.0.cmp(b.0));
        for (url, error) in failures {
            md.push_str(&format!("- {}: {}\n", url, error));
        }
        md.push('\n');
    }

    md
}

/// Keeps table cells on one line and unbroken by pipes
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
