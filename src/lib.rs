//! Sumi-Crawl: a polite, concurrency-bounded crawler core
//!
//! This crate takes batches of URLs, groups them by host, gates every host
//! behind a robots.txt fetch, spaces consecutive downloads to the same host by a
//! configurable cooldown and bounds the number of downloads in flight.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Crawl operations
#[derive(Debug, Error)]
pub enum SumiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
///
/// Every variant describes a URL shape the crawler refuses to schedule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("URL carries a fragment")]
    Fragment,

    #[error("URL carries user info")]
    UserInfo,

    #[error("URL host is an IP literal: {0}")]
    IpHost(String),

    #[error("URL carries an explicit port")]
    ExplicitPort,
}

/// Errors raised by the scheduling structures of the crawl loop
///
/// These indicate misuse of the host queues or the ready heap, never an
/// external fault.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Popping from the empty queue of host {host}")]
    EmptyQueue { host: String },

    #[error("Popping from an empty ready heap")]
    EmptyHeap,

    #[error("No queue registered for host {host}")]
    UnknownHost { host: String },

    #[error("Host queues drained while {pending} ready entries remain in the heap")]
    HeapOutlivedQueues { pending: usize },
}

/// Result type alias for Sumi-Crawl operations
pub type Result<T> = std::result::Result<T, SumiError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, DownloadResult, Downloader, MediaType, Request};
pub use url::{robots_txt_url, split_url, UrlParts};
