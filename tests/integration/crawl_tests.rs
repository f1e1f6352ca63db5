//! Integration tests for the crawl loop
//!
//! These tests drive `Crawler` with a mock downloader that completes every
//! request on its own thread and records what it observed, so politeness and
//! the download cap can be checked end-to-end.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use sumi_crawl::crawler::{crawl_once, CrawlSettings, Crawler};
use sumi_crawl::{ConfigError, DownloadResult, Downloader, MediaType, Request};

/// What the mock downloader saw
#[derive(Default)]
struct Observations {
    dispatched: Vec<String>,
    in_flight: usize,
    max_in_flight: usize,
    busy_hosts: HashSet<String>,
    last_completion: HashMap<String, Instant>,
    violations: Vec<String>,
}

/// Downloader completing requests on spawned threads after a fixed latency
struct MockDownloader {
    observations: Arc<Mutex<Observations>>,
    latency: Duration,
    min_gap: Duration,
    robots: HashMap<String, Option<&'static str>>,
}

impl MockDownloader {
    fn new(latency: Duration, min_gap: Duration) -> Self {
        Self {
            observations: Arc::new(Mutex::new(Observations::default())),
            latency,
            min_gap,
            robots: HashMap::new(),
        }
    }

    /// Serves `body` for this robots.txt URL; unknown robots.txt URLs fail with 404
    fn with_robots(mut self, url: &str, body: Option<&'static str>) -> Self {
        self.robots.insert(url.to_string(), body);
        self
    }

    fn dispatched(&self) -> Vec<String> {
        self.observations.lock().unwrap().dispatched.clone()
    }

    fn max_in_flight(&self) -> usize {
        self.observations.lock().unwrap().max_in_flight
    }

    fn violations(&self) -> Vec<String> {
        self.observations.lock().unwrap().violations.clone()
    }
}

impl Downloader for MockDownloader {
    fn download(&self, request: Request) {
        let host = url::Url::parse(&request.url)
            .unwrap()
            .host_str()
            .unwrap()
            .to_string();

        {
            let now = Instant::now();
            let mut seen = self.observations.lock().unwrap();
            seen.dispatched.push(request.url.clone());
            seen.in_flight += 1;
            seen.max_in_flight = seen.max_in_flight.max(seen.in_flight);

            if !seen.busy_hosts.insert(host.clone()) {
                seen.violations
                    .push(format!("{} dispatched while {} busy", request.url, host));
            }
            if let Some(completed) = seen.last_completion.get(&host).copied() {
                if now < completed + self.min_gap {
                    seen.violations.push(format!(
                        "{} dispatched {:?} after previous download",
                        request.url,
                        now - completed
                    ));
                }
            }
        }

        let result = if request.url.ends_with("/robots.txt") {
            match self.robots.get(&request.url).copied().flatten() {
                Some(body) => DownloadResult::succeeded(
                    request.url.clone(),
                    request.id,
                    body.as_bytes().to_vec(),
                    MediaType::parse("text/plain").unwrap(),
                    1000.0,
                ),
                None => request.failure("http response not successful: 404"),
            }
        } else {
            DownloadResult::succeeded(
                request.url.clone(),
                request.id,
                b"<html></html>".to_vec(),
                MediaType::parse("text/html").unwrap(),
                1000.0,
            )
        };

        let observations = Arc::clone(&self.observations);
        let latency = self.latency;
        std::thread::spawn(move || {
            std::thread::sleep(latency);
            {
                let mut seen = observations.lock().unwrap();
                seen.in_flight -= 1;
                seen.busy_hosts.remove(&host);
                seen.last_completion.insert(host, Instant::now());
            }
            request.complete(result);
        });
    }
}

/// Collects `(id, success)` for every completed caller request
#[derive(Clone, Default)]
struct Completions(Arc<Mutex<Vec<(i64, bool)>>>);

impl Completions {
    fn request(&self, url: &str, id: i64) -> Request {
        let completions = self.clone();
        Request::new(url, id, move |result: DownloadResult| {
            completions.0.lock().unwrap().push((result.id, result.success));
        })
    }

    fn sorted_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.0.lock().unwrap().iter().map(|(id, _)| *id).collect();
        ids.sort();
        ids
    }
}

fn settings(max_active_downloads: usize, per_host_timeout: Duration) -> CrawlSettings {
    CrawlSettings {
        max_active_downloads,
        per_host_timeout,
        robots_agent: "TestBot".to_string(),
    }
}

fn single_batch(
    completions: &Completions,
    urls: &[(&'static str, i64)],
) -> impl FnMut() -> Vec<Request> + Send + 'static {
    let completions = completions.clone();
    let urls = urls.to_vec();
    move || -> Vec<Request> {
        urls.iter()
            .map(|(url, id)| completions.request(url, *id))
            .collect()
    }
}

fn position(dispatched: &[String], url: &str) -> usize {
    dispatched
        .iter()
        .position(|u| u == url)
        .unwrap_or_else(|| panic!("{} was never dispatched", url))
}

#[tokio::test]
async fn test_one_robots_fetch_per_host_then_pages() {
    let downloader = Arc::new(MockDownloader::new(Duration::from_millis(5), Duration::ZERO));
    let completions = Completions::default();

    let mut crawler = Crawler::new(
        settings(10, Duration::ZERO),
        downloader.clone(),
        single_batch(
            &completions,
            &[
                ("http://a.com/x", 1),
                ("http://a.com/y", 2),
                ("http://b.com/z", 3),
            ],
        ),
        crawl_once(),
    )
    .unwrap();

    let report = crawler.crawl().await.unwrap();

    let dispatched = downloader.dispatched();
    assert_eq!(dispatched.len(), 5);
    let robots: Vec<&String> = dispatched
        .iter()
        .filter(|u| u.ends_with("/robots.txt"))
        .collect();
    assert_eq!(robots.len(), 2);

    assert!(position(&dispatched, "http://a.com/robots.txt") < position(&dispatched, "http://a.com/x"));
    assert!(position(&dispatched, "http://a.com/robots.txt") < position(&dispatched, "http://a.com/y"));
    assert!(position(&dispatched, "http://b.com/robots.txt") < position(&dispatched, "http://b.com/z"));

    assert_eq!(completions.sorted_ids(), vec![1, 2, 3]);
    assert_eq!(report.robots_fetches, 2);
    assert_eq!(report.urls_accepted, 3);
    assert!(downloader.violations().is_empty(), "{:?}", downloader.violations());
}

#[tokio::test]
async fn test_single_host_downloads_are_spaced() {
    let timeout = Duration::from_millis(150);
    let downloader = Arc::new(MockDownloader::new(Duration::from_millis(1), timeout));
    let completions = Completions::default();

    let mut crawler = Crawler::new(
        settings(1, timeout),
        downloader.clone(),
        single_batch(
            &completions,
            &[
                ("http://a.com/1", 1),
                ("http://a.com/2", 2),
                ("http://a.com/3", 3),
            ],
        ),
        crawl_once(),
    )
    .unwrap();

    let started = Instant::now();
    crawler.crawl().await.unwrap();
    let elapsed = started.elapsed();

    // robots.txt plus three pages leave three gaps on one host
    assert!(elapsed >= timeout * 3, "finished after {:?}", elapsed);
    assert_eq!(completions.sorted_ids(), vec![1, 2, 3]);
    assert!(downloader.violations().is_empty(), "{:?}", downloader.violations());
}

#[tokio::test]
async fn test_download_cap_holds_across_hosts() {
    let downloader = Arc::new(MockDownloader::new(Duration::from_millis(20), Duration::from_millis(30)));
    let completions = Completions::default();

    let urls: Vec<(&'static str, i64)> = vec![
        ("http://h1.com/a", 1),
        ("http://h1.com/b", 2),
        ("http://h2.com/a", 3),
        ("https://h2.com/b", 4),
        ("http://h3.com/a", 5),
        ("http://h4.com/a", 6),
        ("http://h4.com/b", 7),
        ("http://h5.com/a", 8),
    ];

    let mut crawler = Crawler::new(
        settings(2, Duration::from_millis(30)),
        downloader.clone(),
        single_batch(&completions, &urls),
        crawl_once(),
    )
    .unwrap();

    let report = crawler.crawl().await.unwrap();

    assert!(downloader.max_in_flight() <= 2);
    assert_eq!(downloader.max_in_flight(), 2);
    assert_eq!(completions.sorted_ids(), (1..=8).collect::<Vec<_>>());
    // h2.com is fetched over both schemes
    assert_eq!(report.robots_fetches, 6);
    assert!(downloader.violations().is_empty(), "{:?}", downloader.violations());
}

#[tokio::test]
async fn test_failed_robots_still_dispatches() {
    let downloader = Arc::new(MockDownloader::new(Duration::from_millis(1), Duration::ZERO));
    let completions = Completions::default();

    let mut crawler = Crawler::new(
        settings(4, Duration::ZERO),
        downloader.clone(),
        single_batch(&completions, &[("http://a.com/page", 7)]),
        crawl_once(),
    )
    .unwrap();

    crawler.crawl().await.unwrap();

    assert_eq!(
        downloader.dispatched(),
        vec!["http://a.com/robots.txt", "http://a.com/page"]
    );
    assert_eq!(*completions.0.lock().unwrap(), vec![(7, true)]);
}

#[tokio::test]
async fn test_robots_rules_filter_urls() {
    let downloader = Arc::new(
        MockDownloader::new(Duration::from_millis(1), Duration::ZERO)
            .with_robots("http://a.com/robots.txt", Some("User-agent: *\nDisallow: /admin")),
    );
    let completions = Completions::default();

    let mut crawler = Crawler::new(
        settings(4, Duration::ZERO),
        downloader.clone(),
        single_batch(
            &completions,
            &[("http://a.com/admin/users", 1), ("http://a.com/index", 2)],
        ),
        crawl_once(),
    )
    .unwrap();

    crawler.crawl().await.unwrap();

    let dispatched = downloader.dispatched();
    assert!(!dispatched.contains(&"http://a.com/admin/users".to_string()));
    assert!(dispatched.contains(&"http://a.com/index".to_string()));
    assert_eq!(completions.sorted_ids(), vec![2]);
}

#[tokio::test]
async fn test_invalid_urls_are_dropped_silently() {
    let downloader = Arc::new(MockDownloader::new(Duration::from_millis(1), Duration::ZERO));
    let completions = Completions::default();

    let mut crawler = Crawler::new(
        settings(4, Duration::ZERO),
        downloader.clone(),
        single_batch(
            &completions,
            &[
                ("http://a.com/page#frag", 1),
                ("ftp://a.com/file", 2),
                ("http://127.0.0.1/", 3),
                ("http://a.com:8080/", 4),
                ("http:a.com:80/x", 6),
                ("https:/a.com:443/", 7),
                ("http://b.com/ok", 5),
            ],
        ),
        crawl_once(),
    )
    .unwrap();

    let report = crawler.crawl().await.unwrap();

    assert_eq!(
        downloader.dispatched(),
        vec!["http://b.com/robots.txt", "http://b.com/ok"]
    );
    assert_eq!(completions.sorted_ids(), vec![5]);
    assert_eq!(report.urls_dropped, 6);
}

#[test]
fn test_zero_cap_is_a_configuration_error() {
    let downloader = Arc::new(MockDownloader::new(Duration::ZERO, Duration::ZERO));
    let result = Crawler::new(settings(0, Duration::ZERO), downloader, Vec::new, crawl_once());
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[tokio::test]
async fn test_stopped_crawler_never_asks_dispatcher() {
    let downloader = Arc::new(MockDownloader::new(Duration::ZERO, Duration::ZERO));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut crawler = Crawler::new(
        settings(1, Duration::ZERO),
        downloader.clone(),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Vec::new()
        },
        || false,
    )
    .unwrap();

    let report = crawler.crawl().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.cycles, 0);
    assert!(downloader.dispatched().is_empty());
}

#[tokio::test]
async fn test_cycles_run_until_predicate_stops() {
    let downloader = Arc::new(MockDownloader::new(Duration::from_millis(1), Duration::ZERO));
    let completions = Completions::default();

    let mut remaining = 3;
    let mut next_id = 0;
    let batch_completions = completions.clone();

    let mut crawler = Crawler::new(
        settings(2, Duration::ZERO),
        downloader.clone(),
        move || {
            next_id += 1;
            vec![batch_completions.request("http://a.com/page", next_id)]
        },
        move || {
            if remaining == 0 {
                return false;
            }
            remaining -= 1;
            true
        },
    )
    .unwrap();

    let report = crawler.crawl().await.unwrap();

    assert_eq!(report.cycles, 3);
    assert_eq!(report.robots_fetches, 3);
    assert_eq!(completions.sorted_ids(), vec![1, 2, 3]);
    // Each cycle starts from fresh host queues, so robots.txt is fetched again
    assert_eq!(downloader.dispatched().len(), 6);
}
