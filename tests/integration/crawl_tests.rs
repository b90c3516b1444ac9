//! Integration tests for the crawler
//!
//! Most tests drive [`WebCrawler`] over an in-memory link graph that records
//! how it was called. The last ones use wiremock to run the HTTP downloader
//! end-to-end.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strata_crawler::config::{CrawlerConfig, HttpConfig, UserAgentConfig};
use strata_crawler::crawler::{
    CrawlError, Document, Downloader, ExtractError, FetchError, HttpDownloader, WebCrawler,
};
use strata_crawler::{host_of, PermittedHosts};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

enum Page {
    Links(Vec<String>),
    Unreadable,
    Stuck,
}

struct GraphDocument {
    links: Option<Vec<String>>,
    link_calls: Arc<AtomicUsize>,
}

impl Document for GraphDocument {
    fn links(&self) -> Result<Vec<String>, ExtractError> {
        self.link_calls.fetch_add(1, Ordering::SeqCst);
        self.links
            .clone()
            .ok_or_else(|| ExtractError::Malformed("unreadable page".to_string()))
    }
}

/// In-memory link graph that tracks concurrency and call counts
///
/// Pages missing from the graph fail with a 404. With `fan_out` set, every
/// unknown URL instead links to that many children below itself.
#[derive(Default)]
struct GraphDownloader {
    pages: HashMap<String, Page>,
    fan_out: Option<usize>,
    delay: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
    active_by_host: Mutex<HashMap<String, usize>>,
    peak_by_host: Mutex<HashMap<String, usize>>,
    requests: Mutex<HashMap<String, usize>>,
    link_calls: Arc<AtomicUsize>,
}

impl GraphDownloader {
    fn new(edges: Vec<(&str, Vec<&str>)>) -> Self {
        let pages = edges
            .into_iter()
            .map(|(page, links)| {
                let links = links.into_iter().map(str::to_string).collect();
                (page.to_string(), Page::Links(links))
            })
            .collect();
        Self {
            pages,
            ..Self::default()
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn with_fan_out(mut self, children: usize) -> Self {
        self.fan_out = Some(children);
        self
    }

    fn with_unreadable(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Page::Unreadable);
        self
    }

    /// Downloads of `url` never return
    fn with_stuck(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Page::Stuck);
        self
    }

    fn requested_urls(&self) -> Vec<String> {
        self.requests.lock().unwrap().keys().cloned().collect()
    }

    fn requests_for(&self, url: &str) -> usize {
        self.requests.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn peak_for(&self, host: &str) -> usize {
        self.peak_by_host.lock().unwrap().get(host).copied().unwrap_or(0)
    }

    fn enter(&self, url: &str) -> String {
        *self.requests.lock().unwrap().entry(url.to_string()).or_default() += 1;

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let host = host_of(url).unwrap();
        let mut active = self.active_by_host.lock().unwrap();
        let count = active.entry(host.clone()).or_default();
        *count += 1;
        let mut peak = self.peak_by_host.lock().unwrap();
        let high = peak.entry(host.clone()).or_default();
        *high = (*high).max(*count);
        host
    }

    fn leave(&self, host: &str) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        if let Some(count) = self.active_by_host.lock().unwrap().get_mut(host) {
            *count -= 1;
        }
    }
}

#[async_trait]
impl Downloader for GraphDownloader {
    async fn download(&self, url: &str) -> Result<Box<dyn Document>, FetchError> {
        let host = self.enter(url);
        if let Some(Page::Stuck) = self.pages.get(url) {
            std::future::pending::<()>().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.leave(&host);

        let links = match (self.pages.get(url), self.fan_out) {
            (Some(Page::Links(links)), _) => Some(links.clone()),
            (Some(Page::Unreadable), _) => None,
            (Some(Page::Stuck), _) => unreachable!("stuck downloads never finish"),
            (None, Some(fan_out)) => Some(
                (0..fan_out)
                    .map(|child| format!("{}/{}", url.trim_end_matches('/'), child))
                    .collect(),
            ),
            (None, None) => {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
            }
        };

        Ok(Box::new(GraphDocument {
            links,
            link_calls: Arc::clone(&self.link_calls),
        }))
    }
}

fn config(downloaders: usize, extractors: usize, per_host: usize) -> CrawlerConfig {
    CrawlerConfig {
        depth: 1,
        downloaders,
        extractors,
        per_host,
        shutdown_timeout_secs: 1,
    }
}

fn crawler_for(downloader: &Arc<GraphDownloader>, config: &CrawlerConfig) -> WebCrawler {
    let shared: Arc<dyn Downloader> = Arc::clone(downloader) as Arc<dyn Downloader>;
    WebCrawler::new(shared, config).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_host_and_pool_limits() {
    let mut children = vec![];
    for host in ["a.com", "b.com", "c.com"] {
        for page in 0..10 {
            children.push(format!("http://{}/{}", host, page));
        }
    }
    let edges = vec![(
        "http://start.com/",
        children.iter().map(String::as_str).collect(),
    )];
    // Children are unknown pages without links
    let downloader = Arc::new(
        GraphDownloader::new(edges)
            .with_delay(Duration::from_millis(20))
            .with_fan_out(0),
    );
    let crawler = crawler_for(&downloader, &config(5, 2, 2));

    let result = crawler.crawl("http://start.com/", 2).await;

    assert_eq!(result.downloaded.len(), 31);
    assert!(result.errors.is_empty());
    for host in ["a.com", "b.com", "c.com"] {
        let peak = downloader.peak_for(host);
        assert!(peak <= 2, "{} saw {} concurrent downloads", host, peak);
    }
    assert!(downloader.peak.load(Ordering::SeqCst) <= 5);
    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_each_url_downloaded_once() {
    // Diamond with a cycle back to the start
    let downloader = Arc::new(GraphDownloader::new(vec![
        ("http://a.com/", vec!["http://a.com/b", "http://a.com/c"]),
        ("http://a.com/b", vec!["http://a.com/d", "http://a.com/"]),
        ("http://a.com/c", vec!["http://a.com/d", "http://a.com/b"]),
        ("http://a.com/d", vec!["http://a.com/", "http://a.com/c"]),
    ]));
    let crawler = crawler_for(&downloader, &config(4, 2, 4));

    let result = crawler.crawl("http://a.com/", 5).await;

    assert_eq!(
        result.downloaded,
        vec![
            "http://a.com/",
            "http://a.com/b",
            "http://a.com/c",
            "http://a.com/d"
        ]
    );
    for url in &result.downloaded {
        assert_eq!(downloader.requests_for(url), 1, "{} requested twice", url);
    }
    crawler.close().await;
}

#[tokio::test]
async fn test_depth_one_skips_extraction() {
    let downloader = Arc::new(GraphDownloader::new(vec![(
        "http://a.com/",
        vec!["http://a.com/next"],
    )]));
    let crawler = crawler_for(&downloader, &config(2, 2, 2));

    let result = crawler.crawl("http://a.com/", 1).await;

    assert_eq!(result.downloaded, vec!["http://a.com/"]);
    assert_eq!(downloader.link_calls.load(Ordering::SeqCst), 0);
    assert_eq!(downloader.requests_for("http://a.com/next"), 0);
    crawler.close().await;
}

#[tokio::test]
async fn test_permitted_hosts_filter() {
    let downloader = Arc::new(GraphDownloader::new(vec![
        ("http://a.com/", vec!["http://b.com/"]),
        ("http://b.com/", vec!["http://c.com/"]),
        ("http://c.com/", vec![]),
    ]));
    let crawler = crawler_for(&downloader, &config(2, 2, 2));
    let permitted: PermittedHosts = ["a.com", "b.com"].into_iter().collect();

    let result = crawler
        .crawl_with_hosts("http://a.com/", 3, &permitted)
        .await;

    assert_eq!(result.downloaded, vec!["http://a.com/", "http://b.com/"]);
    assert!(result.errors.is_empty());
    assert_eq!(downloader.requests_for("http://c.com/"), 0);
    crawler.close().await;
}

#[tokio::test]
async fn test_wildcard_host_pattern() {
    let downloader = Arc::new(GraphDownloader::new(vec![
        (
            "http://example.com/",
            vec!["http://docs.example.com/", "http://other.com/"],
        ),
        ("http://docs.example.com/", vec![]),
        ("http://other.com/", vec![]),
    ]));
    let crawler = crawler_for(&downloader, &config(2, 2, 2));
    let permitted: PermittedHosts = ["*.example.com"].into_iter().collect();

    let result = crawler
        .crawl_with_hosts("http://example.com/", 2, &permitted)
        .await;

    assert_eq!(
        result.downloaded,
        vec!["http://example.com/", "http://docs.example.com/"]
    );
    assert_eq!(downloader.requests_for("http://other.com/"), 0);
    crawler.close().await;
}

#[tokio::test]
async fn test_failed_pages_do_not_stop_the_crawl() {
    let downloader = Arc::new(GraphDownloader::new(vec![
        (
            "http://a.com/",
            vec!["http://a.com/ok", "http://a.com/missing", "not a url"],
        ),
        ("http://a.com/ok", vec!["http://a.com/deeper"]),
        ("http://a.com/deeper", vec![]),
    ]));
    let crawler = crawler_for(&downloader, &config(2, 2, 2));

    let result = crawler.crawl("http://a.com/", 3).await;

    assert_eq!(
        result.downloaded,
        vec!["http://a.com/", "http://a.com/ok", "http://a.com/deeper"]
    );
    assert!(matches!(
        result.error_for("http://a.com/missing"),
        Some(CrawlError::Fetch(FetchError::Status { status: 404, .. }))
    ));
    assert!(matches!(
        result.error_for("not a url"),
        Some(CrawlError::Malformed(_))
    ));
    assert_eq!(result.errors.len(), 2);
    crawler.close().await;
}

#[tokio::test]
async fn test_extraction_failure_is_reported() {
    let downloader = Arc::new(
        GraphDownloader::new(vec![
            ("http://a.com/", vec!["http://a.com/broken", "http://a.com/fine"]),
            ("http://a.com/fine", vec!["http://a.com/leaf"]),
            ("http://a.com/leaf", vec![]),
        ])
        .with_unreadable("http://a.com/broken"),
    );
    let crawler = crawler_for(&downloader, &config(2, 2, 2));

    let result = crawler.crawl("http://a.com/", 3).await;

    assert!(result.is_downloaded("http://a.com/broken"));
    assert!(result.is_downloaded("http://a.com/leaf"));
    assert!(result.error_for("http://a.com/broken").is_none());
    assert!(result.extraction_failures.contains_key("http://a.com/broken"));
    crawler.close().await;
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let downloader = Arc::new(GraphDownloader::new(vec![]));
    let crawler = crawler_for(&downloader, &config(2, 2, 2));

    crawler.close().await;
    crawler.close().await;

    assert!(crawler.is_closed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_during_crawl_returns() {
    let downloader = Arc::new(
        GraphDownloader::new(vec![])
            .with_delay(Duration::from_millis(50))
            .with_fan_out(5),
    );
    let crawler = Arc::new(crawler_for(&downloader, &config(2, 1, 1)));

    let crawling = {
        let crawler = Arc::clone(&crawler);
        tokio::spawn(async move { crawler.crawl("http://a.com/", 10).await })
    };
    tokio::time::sleep(Duration::from_millis(120)).await;

    tokio::time::timeout(Duration::from_secs(10), crawler.close())
        .await
        .expect("close did not return");
    let result = tokio::time::timeout(Duration::from_secs(10), crawling)
        .await
        .expect("crawl did not return after close")
        .unwrap();

    assert!(result.is_downloaded("http://a.com/"));
    for url in downloader.requested_urls() {
        assert!(
            result.is_downloaded(&url) || result.error_for(&url).is_some(),
            "{} has no outcome",
            url
        );
    }
    assert!(crawler.is_closed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_records_unfinished_downloads() {
    let downloader = Arc::new(
        GraphDownloader::new(vec![(
            "http://a.com/",
            vec!["http://a.com/1", "http://a.com/2", "http://a.com/3"],
        )])
        .with_stuck("http://a.com/1")
        .with_stuck("http://a.com/2")
        .with_stuck("http://a.com/3"),
    );
    // One slot for a.com: one stuck download runs, two wait behind it
    let crawler = Arc::new(crawler_for(&downloader, &config(2, 1, 1)));

    let crawling = {
        let crawler = Arc::clone(&crawler);
        tokio::spawn(async move { crawler.crawl("http://a.com/", 3).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    tokio::time::timeout(Duration::from_secs(10), crawler.close())
        .await
        .expect("close did not return");
    let result = tokio::time::timeout(Duration::from_secs(10), crawling)
        .await
        .expect("crawl did not return after close")
        .unwrap();

    assert_eq!(result.downloaded, vec!["http://a.com/"]);
    for url in ["http://a.com/1", "http://a.com/2", "http://a.com/3"] {
        assert!(
            matches!(
                result.error_for(url),
                Some(CrawlError::Fetch(FetchError::Interrupted { .. }))
            ),
            "{} was not recorded as interrupted",
            url
        );
    }
    assert_eq!(result.errors.len(), 3);
}

const INDEX: &str = r#"<html><head><title>Home</title></head><body>
<a href="/page1">Page one</a>
<a href="/missing">Gone</a>
<a href="mailto:someone@example.com">Mail</a>
</body></html>"#;

const PAGE_ONE: &str = r#"<html><body><a href="/">Home</a></body></html>"#;

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(INDEX, "text/html"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PAGE_ONE, "text/html"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_http_crawl_end_to_end() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();

    let downloader = HttpDownloader::new(&UserAgentConfig::default(), &HttpConfig::default())
        .expect("Failed to build HTTP downloader");
    let crawler = WebCrawler::new(Arc::new(downloader), &config(2, 2, 2)).unwrap();

    let result = crawler.crawl(&format!("{}/", base), 3).await;

    assert_eq!(
        result.downloaded,
        vec![format!("{}/", base), format!("{}/page1", base)]
    );
    assert!(matches!(
        result.error_for(&format!("{}/missing", base)),
        Some(CrawlError::Fetch(FetchError::Status { status: 404, .. }))
    ));
    assert_eq!(result.errors.len(), 1);
    crawler.close().await;
}

#[tokio::test]
async fn test_http_crawl_with_permitted_host() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();

    // Extract host from base (e.g., "127.0.0.1" from "http://127.0.0.1:12345")
    let host = url::Url::parse(&base)
        .expect("Failed to parse base URL")
        .host_str()
        .expect("Failed to extract host")
        .to_string();
    let permitted: PermittedHosts = [host].into_iter().collect();

    let downloader = HttpDownloader::new(&UserAgentConfig::default(), &HttpConfig::default())
        .expect("Failed to build HTTP downloader");
    let crawler = WebCrawler::new(Arc::new(downloader), &config(1, 1, 1)).unwrap();

    let result = crawler
        .crawl_with_hosts(&format!("{}/", base), 2, &permitted)
        .await;

    assert_eq!(result.downloaded.len(), 2);
    assert_eq!(result.errors.len(), 1);
    crawler.close().await;
}
