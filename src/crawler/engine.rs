//! Crawl engine - breadth-first orchestration
//!
//! [`WebCrawler`] owns two worker pools, one for downloads and one for link
//! extraction, and reuses them across crawls until [`WebCrawler::close`].
//!
//! A crawl proceeds one level at a time:
//! 1. Every frontier URL is resolved to a host, filtered, registered with the
//!    level barrier and scheduled through that host's throttle
//! 2. A download job fetches the page and, if another level follows, submits
//!    an extraction job for it
//! 3. Extraction jobs put unseen links into the next frontier
//! 4. The orchestrator waits on the barrier, then advances

use crate::config::{validate_engine_config, CrawlerConfig};
use crate::crawler::barrier::{LevelBarrier, Registration};
use crate::crawler::pool::{Job, WorkerPool};
use crate::crawler::state::{CrawlResult, CrawlState};
use crate::crawler::throttle::HostThrottle;
use crate::crawler::traits::{CrawlError, Document, Downloader, FetchError};
use crate::url::{host_of, PermittedHosts};
use crate::CrawlerError;
use dashmap::DashSet;
use futures::FutureExt;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

/// Concurrent breadth-first crawler
pub struct WebCrawler {
    downloader: Arc<dyn Downloader>,
    download_pool: Arc<WorkerPool>,
    extraction_pool: Arc<WorkerPool>,
    per_host: usize,
    shutdown_timeout: Duration,
}

/// State shared by every job of one crawl
struct CrawlContext {
    downloader: Arc<dyn Downloader>,
    extraction_pool: Arc<WorkerPool>,
    state: CrawlState,
    depth: u32,
}

/// One breadth-first level
struct Level {
    index: u32,
    frontier: HashSet<String>,
    previous: Arc<HashSet<String>>,
    next: DashSet<String>,
    barrier: Arc<LevelBarrier>,
}

impl Level {
    /// Returns true if a discovered link belongs to this level or the one before
    fn contains(&self, url: &str) -> bool {
        self.frontier.contains(url) || self.previous.contains(url)
    }
}

impl WebCrawler {
    /// Creates a crawler and starts its worker pools
    ///
    /// Must be called from within a tokio runtime; the pools are spawned on
    /// it.
    ///
    /// # Arguments
    ///
    /// * `downloader` - Fetches pages for every crawl run by this instance
    /// * `config` - Pool sizes, per-host limit and shutdown timeout
    ///
    /// # Returns
    ///
    /// * `Ok(WebCrawler)` - Pools are running
    /// * `Err(CrawlerError::Config)` - A pool size or the per-host limit is zero
    /// * `Err(CrawlerError::Runtime)` - No tokio runtime is active
    pub fn new(downloader: Arc<dyn Downloader>, config: &CrawlerConfig) -> Result<Self, CrawlerError> {
        validate_engine_config(config)?;
        let runtime = Handle::try_current().map_err(|e| CrawlerError::Runtime(e.to_string()))?;

        tracing::info!(
            "Starting crawler: {} downloaders, {} extractors, {} per host",
            config.downloaders,
            config.extractors,
            config.per_host
        );

        Ok(Self {
            downloader,
            download_pool: Arc::new(WorkerPool::new("download", config.downloaders, &runtime)),
            extraction_pool: Arc::new(WorkerPool::new("extract", config.extractors, &runtime)),
            per_host: config.per_host,
            shutdown_timeout: config.shutdown_timeout(),
        })
    }

    /// Crawls `url` down to `depth` levels, following every host
    pub async fn crawl(&self, url: &str, depth: u32) -> CrawlResult {
        self.run(url, depth, None).await
    }

    /// Crawls `url` down to `depth` levels, following only permitted hosts
    ///
    /// URLs on other hosts are skipped without being recorded as errors.
    pub async fn crawl_with_hosts(
        &self,
        url: &str,
        depth: u32,
        permitted: &PermittedHosts,
    ) -> CrawlResult {
        self.run(url, depth, Some(permitted)).await
    }

    /// Shuts both pools down
    ///
    /// Safe to call more than once and while a crawl is running; that crawl
    /// then returns what it finished. Never fails: pools that outlive the
    /// timeout are logged.
    pub async fn close(&self) {
        tracing::info!("Closing crawler");
        tokio::join!(
            self.download_pool.shutdown(self.shutdown_timeout),
            self.extraction_pool.shutdown(self.shutdown_timeout),
        );
    }

    pub fn is_closed(&self) -> bool {
        self.download_pool.is_closed()
    }

    async fn run(&self, start_url: &str, depth: u32, permitted: Option<&PermittedHosts>) -> CrawlResult {
        let started = Instant::now();
        tracing::info!("Crawling {} to depth {}", start_url, depth);
        if self.is_closed() {
            tracing::warn!("Crawler is closed, nothing will be downloaded");
        }

        let context = Arc::new(CrawlContext {
            downloader: Arc::clone(&self.downloader),
            extraction_pool: Arc::clone(&self.extraction_pool),
            state: CrawlState::new(),
            depth,
        });
        let mut hosts: HashMap<String, Arc<HostThrottle>> = HashMap::new();
        let mut downloaded = Vec::new();

        let mut frontier = HashSet::from([start_url.to_string()]);
        let mut previous = Arc::new(HashSet::new());

        for index in 0..depth {
            if frontier.is_empty() {
                tracing::debug!("Frontier empty at level {}, stopping", index);
                break;
            }
            tracing::info!("Level {}: {} URLs", index, frontier.len());

            let level = Arc::new(Level {
                index,
                frontier,
                previous,
                next: DashSet::new(),
                barrier: LevelBarrier::new(),
            });

            for url in &level.frontier {
                self.schedule(&context, &level, url, permitted, &mut hosts);
            }
            level.barrier.arrive_and_await_advance().await;

            let mut finished: Vec<String> = level
                .frontier
                .iter()
                .filter(|url| context.state.is_downloaded(url))
                .cloned()
                .collect();
            finished.sort();
            downloaded.extend(finished);

            frontier = level.next.iter().map(|url| url.key().clone()).collect();
            previous = Arc::new(level.frontier.clone());
        }

        let result = context.state.take_result(downloaded);
        tracing::info!(
            "Crawl of {} finished in {:?}: {} downloaded, {} errors",
            start_url,
            started.elapsed(),
            result.downloaded.len(),
            result.errors.len()
        );
        result
    }

    /// Resolves, filters and submits one frontier URL
    fn schedule(
        &self,
        context: &Arc<CrawlContext>,
        level: &Arc<Level>,
        url: &str,
        permitted: Option<&PermittedHosts>,
        hosts: &mut HashMap<String, Arc<HostThrottle>>,
    ) {
        let host = match host_of(url) {
            Ok(host) => host,
            Err(e) => {
                tracing::debug!("Malformed URL {}: {}", url, e);
                context.state.record_error(url, CrawlError::Malformed(e));
                return;
            }
        };

        if permitted.is_some_and(|permitted| !permitted.permits(&host)) {
            tracing::debug!("Skipping {}: host {} not permitted", url, host);
            return;
        }

        let throttle = hosts.entry(host).or_insert_with_key(|host| {
            HostThrottle::new(host.clone(), self.per_host, Arc::clone(&self.download_pool))
        });

        let registration = level.barrier.register();
        tracing::debug!("Scheduling {} (level {})", url, level.index);
        throttle.schedule(download_job(
            Arc::clone(context),
            Arc::clone(level),
            url.to_string(),
            registration,
        ));
    }
}

/// Outcome bookkeeping for one scheduled download
///
/// Records the URL as interrupted if the job is dropped before the download
/// settles, which happens when the crawler closes or the job panics. The
/// error is recorded before the barrier registration is released.
struct PendingDownload {
    context: Arc<CrawlContext>,
    url: String,
    settled: bool,
    _registration: Registration,
}

impl Drop for PendingDownload {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!("Download of {} interrupted", self.url);
            self.context.state.record_error(
                &self.url,
                CrawlError::Fetch(FetchError::Interrupted {
                    url: self.url.clone(),
                }),
            );
        }
    }
}

fn download_job(
    context: Arc<CrawlContext>,
    level: Arc<Level>,
    url: String,
    registration: Registration,
) -> Job {
    let mut pending = PendingDownload {
        context,
        url,
        settled: false,
        _registration: registration,
    };

    async move {
        let context = Arc::clone(&pending.context);
        let url = pending.url.clone();

        match context.downloader.download(&url).await {
            Ok(document) => {
                context.state.mark_downloaded(&url);
                pending.settled = true;
                tracing::debug!("Downloaded {}", url);

                if level.index + 1 < context.depth {
                    let follow_up = level.barrier.register();
                    let job = extraction_job(Arc::clone(&context), Arc::clone(&level), url, document, follow_up);
                    if context.extraction_pool.submit(job).is_err() {
                        tracing::debug!("Extraction pool closed, links not followed");
                    }
                }
            }
            Err(e) => {
                tracing::debug!("Failed to download {}: {}", url, e);
                context.state.record_error(&url, CrawlError::Fetch(e));
                pending.settled = true;
            }
        }
    }
    .boxed()
}

fn extraction_job(
    context: Arc<CrawlContext>,
    level: Arc<Level>,
    url: String,
    document: Box<dyn Document>,
    registration: Registration,
) -> Job {
    async move {
        let _registration = registration;

        match document.links() {
            Ok(links) => {
                let mut added = 0;
                for link in links {
                    if context.state.is_settled(&link) || level.contains(&link) {
                        continue;
                    }
                    if level.next.insert(link) {
                        added += 1;
                    }
                }
                tracing::trace!("{} contributed {} new links", url, added);
            }
            Err(e) => {
                tracing::warn!("Failed to extract links from {}: {}", url, e);
                context.state.record_extraction_failure(&url, e);
            }
        }
    }
    .boxed()
}
