use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sumi-Crawl
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of downloads in flight across all hosts
    #[serde(rename = "max-active-downloads")]
    pub max_active_downloads: usize,

    /// Minimum time between the end of one download and the start of the next on a host (milliseconds)
    #[serde(rename = "per-host-timeout")]
    pub per_host_timeout: u64,

    /// Maximum accepted size of a downloaded document (bytes)
    #[serde(rename = "max-content-length")]
    pub max_content_length: usize,

    /// Maximum number of URLs read from a URL list file
    #[serde(rename = "max-urls")]
    pub max_urls: usize,

    /// Media types (`type/subtype`) the downloader keeps; empty accepts everything
    #[serde(rename = "accepted-media-types")]
    pub accepted_media_types: Vec<String>,
}

impl CrawlerConfig {
    /// The per-host cooldown as a `Duration`
    pub fn per_host_timeout(&self) -> Duration {
        Duration::from_millis(self.per_host_timeout)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_active_downloads: 10,
            per_host_timeout: 2000,
            max_content_length: 1024 * 1024,
            max_urls: 100,
            accepted_media_types: vec!["text/html".to_string(), "text/plain".to_string()],
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler, also used as the robots.txt agent name
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the HTTP user agent: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SumiCrawl".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving one file per download result
    pub directory: String,

    /// Prefix of every result file name
    pub prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            prefix: "_".to_string(),
        }
    }
}
