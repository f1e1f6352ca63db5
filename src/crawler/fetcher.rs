//! HTTP downloader
//!
//! This module implements `Downloader` over reqwest. Each request becomes one
//! tokio task on the runtime the downloader was created in:
//! - the response status must be 2xx
//! - the `Content-Type` must be one of the accepted media types
//! - the body must stay within the configured content length
//!
//! Any violation is delivered as a failed `DownloadResult`, never as an error.

use crate::config::{Config, UserAgentConfig};
use crate::crawler::request::{DownloadResult, Downloader, MediaType, Request};
use crate::SumiError;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect::Policy, Client};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinSet;

/// Checks applied to every response
#[derive(Debug, Clone)]
pub struct DownloadLimits {
    /// Largest accepted body, in bytes
    pub max_content_length: usize,

    /// Accepted `type/subtype` values; empty accepts everything
    pub accepted_media_types: Vec<String>,
}

impl DownloadLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_content_length: config.crawler.max_content_length,
            accepted_media_types: config.crawler.accepted_media_types.clone(),
        }
    }

    /// Returns whether a response of this media type is kept
    pub fn accepts(&self, media_type: &MediaType) -> bool {
        self.accepted_media_types.is_empty()
            || self
                .accepted_media_types
                .iter()
                .any(|accepted| media_type.matches(accepted))
    }
}

/// Builds an HTTP client with proper configuration
///
/// The user agent has the form `CrawlerName/Version (+ContactURL; ContactEmail)`.
///
/// # Example
///
/// ```no_run
/// use sumi_crawl::config::UserAgentConfig;
/// use sumi_crawl::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `Downloader` backed by reqwest, running one tokio task per download
///
/// Dropping the downloader aborts every unfinished download; their callbacks
/// never run.
pub struct ReqwestDownloader {
    client: Client,
    limits: Arc<DownloadLimits>,
    runtime: Handle,
    tasks: Mutex<JoinSet<()>>,
}

impl ReqwestDownloader {
    /// Creates a downloader bound to the current tokio runtime
    ///
    /// # Errors
    ///
    /// Fails outside a tokio runtime, or when the HTTP client cannot be built.
    pub fn new(user_agent: &UserAgentConfig, limits: DownloadLimits) -> Result<Self, SumiError> {
        let runtime = Handle::try_current()
            .map_err(|e| SumiError::Runtime(format!("no tokio runtime: {}", e)))?;
        let client = build_http_client(user_agent)?;

        Ok(Self {
            client,
            limits: Arc::new(limits),
            runtime,
            tasks: Mutex::new(JoinSet::new()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, SumiError> {
        Self::new(&config.user_agent, DownloadLimits::from_config(config))
    }

    /// Number of downloads started and not yet reaped
    pub fn in_flight(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        reap(&mut tasks);
        tasks.len()
    }
}

impl Downloader for ReqwestDownloader {
    fn download(&self, request: Request) {
        let client = self.client.clone();
        let limits = Arc::clone(&self.limits);

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        reap(&mut tasks);
        tasks.spawn_on(
            async move {
                let result = fetch_url(&client, &limits, &request.url, request.id).await;
                if !result.success {
                    tracing::debug!("Download of {} failed: {}", result.url, result.error_message);
                }
                request.complete(result);
            },
            &self.runtime,
        );
    }
}

// Finished tasks stay in the set until joined
fn reap(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.try_join_next() {
        if let Err(e) = joined {
            if e.is_panic() {
                tracing::error!("Download task panicked: {}", e);
            }
        }
    }
}

/// Downloads one URL and checks it against `limits`
pub async fn fetch_url(client: &Client, limits: &DownloadLimits, url: &str, id: i64) -> DownloadResult {
    let started = Instant::now();

    let mut response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return DownloadResult::failed(url, id, classify_error(&e)),
    };

    let status = response.status();
    if !status.is_success() {
        return DownloadResult::failed(
            url,
            id,
            format!("http response not successful: {}", status.as_u16()),
        );
    }

    let media_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(MediaType::parse);
    let media_type = match media_type {
        Some(media_type) if limits.accepts(&media_type) => media_type,
        Some(media_type) => {
            return DownloadResult::failed(url, id, format!("media type not accepted: {}", media_type))
        }
        None if limits.accepted_media_types.is_empty() => MediaType::default(),
        None => return DownloadResult::failed(url, id, "missing or invalid content type"),
    };

    let max = limits.max_content_length;
    if let Some(declared) = response.content_length() {
        if declared > max as u64 {
            return DownloadResult::failed(
                url,
                id,
                format!("content length {} exceeds maximum of {} bytes", declared, max),
            );
        }
    }

    let mut content = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if content.len() + chunk.len() > max {
                    return DownloadResult::failed(
                        url,
                        id,
                        format!("content exceeds maximum of {} bytes", max),
                    );
                }
                content.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(e) => return DownloadResult::failed(url, id, classify_error(&e)),
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    let download_speed = if elapsed > 0.0 {
        content.len() as f64 / elapsed
    } else {
        content.len() as f64
    };

    DownloadResult::succeeded(url, id, content, media_type, download_speed)
}

fn classify_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else {
        e.to_string()
    }
}
