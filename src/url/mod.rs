//! URL handling module for Sumi-Crawl
//!
//! This module decides which URLs the crawler is willing to schedule, splits
//! them into the (scheme, host) pair the scheduler groups by, and reads URL
//! lists from disk.

mod domain;
mod list;

pub use domain::{robots_txt_url, split_url, UrlParts};
pub use list::read_url_list;

/// Returns true if the URL would be accepted by the scheduler
///
/// # Examples
///
/// ```
/// use sumi_crawl::url::is_crawlable;
///
/// assert!(is_crawlable("https://example.com/page"));
/// assert!(!is_crawlable("ftp://example.com/file"));
/// assert!(!is_crawlable("https://example.com:8443/"));
/// ```
pub fn is_crawlable(url: &str) -> bool {
    split_url(url).is_ok()
}
