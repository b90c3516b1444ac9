//! Strata crawler main entry point
//!
//! This is the command-line interface for the breadth-first web crawler.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_crawler::config::{load_config, validate, Config};
use strata_crawler::crawler::{HttpDownloader, WebCrawler};
use strata_crawler::output::{print_result, write_markdown_report, CrawlReport};
use strata_crawler::PermittedHosts;
use tracing_subscriber::EnvFilter;

/// Strata: a concurrent breadth-first web crawler
///
/// Downloads every page reachable from URL within DEPTH levels, using
/// separate pools for downloading and link extraction and a per-host limit
/// on concurrent downloads.
#[derive(Parser, Debug)]
#[command(name = "strata-crawler")]
#[command(version)]
#[command(about = "A concurrent breadth-first web crawler", long_about = None)]
struct Cli {
    /// Start URL
    #[arg(value_name = "URL")]
    url: String,

    /// Number of levels to download [default: 1]
    #[arg(value_name = "DEPTH")]
    depth: Option<u32>,

    /// Download pool size [default: 1]
    #[arg(value_name = "DOWNLOADERS")]
    downloaders: Option<usize>,

    /// Extraction pool size [default: 1]
    #[arg(value_name = "EXTRACTORS")]
    extractors: Option<usize>,

    /// Concurrent downloads allowed per host [default: 4]
    #[arg(value_name = "PER_HOST")]
    per_host: Option<usize>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only follow links to this host (repeatable, `*.` prefix matches subdomains)
    #[arg(long = "host", value_name = "HOST")]
    hosts: Vec<String>,

    /// Write a markdown report to this path
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;
    run(&cli, config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("strata_crawler=info,warn"),
            1 => EnvFilter::new("strata_crawler=debug,info"),
            2 => EnvFilter::new("strata_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file if one was given and applies command-line overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(depth) = cli.depth {
        config.crawler.depth = depth;
    }
    if let Some(downloaders) = cli.downloaders {
        config.crawler.downloaders = downloaders;
    }
    if let Some(extractors) = cli.extractors {
        config.crawler.extractors = extractors;
    }
    if let Some(per_host) = cli.per_host {
        config.crawler.per_host = per_host;
    }
    if !cli.hosts.is_empty() {
        config.permitted_hosts = Some(cli.hosts.clone());
    }
    if let Some(report) = &cli.report {
        config.output.report_path = Some(report.display().to_string());
    }

    validate(&config).context("invalid configuration")?;
    Ok(config)
}

/// Runs one crawl and reports on it
async fn run(cli: &Cli, config: Config) -> anyhow::Result<()> {
    let downloader = HttpDownloader::new(&config.user_agent, &config.http)
        .context("failed to build HTTP client")?;
    let crawler = WebCrawler::new(Arc::new(downloader), &config.crawler)?;

    let depth = config.crawler.depth;
    let started_at = Utc::now();
    let result = match &config.permitted_hosts {
        Some(hosts) => {
            let permitted: PermittedHosts = hosts.iter().cloned().collect();
            tracing::info!("Following {} permitted host patterns", permitted.len());
            crawler.crawl_with_hosts(&cli.url, depth, &permitted).await
        }
        None => crawler.crawl(&cli.url, depth).await,
    };
    let finished_at = Utc::now();

    crawler.close().await;

    print_result(&result)?;

    if let Some(path) = &config.output.report_path {
        let report = CrawlReport::new(&cli.url, depth, started_at, finished_at, &result);
        write_markdown_report(&report, Path::new(path))
            .with_context(|| format!("failed to write report to {}", path))?;
        tracing::info!("Report written to {}", path);
    }

    Ok(())
}
