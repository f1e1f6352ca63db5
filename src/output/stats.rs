//! Crawl statistics
//!
//! This module collects the counters of one `Crawler::crawl` call and prints
//! them once the crawl is over.

use crate::robots::GroupingSummary;
use chrono::{DateTime, Utc};

/// Summary of one crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// When the crawl started
    pub started_at: DateTime<Utc>,

    /// When the crawl finished, if it has
    pub finished_at: Option<DateTime<Utc>>,

    /// Number of dispatcher batches processed
    pub cycles: u64,

    /// URLs handed over by the dispatcher
    pub urls_received: u64,

    /// URLs that passed validation and waited for their robots.txt
    pub urls_accepted: u64,

    /// URLs dropped for an unsupported shape
    pub urls_dropped: u64,

    /// Robots.txt downloads scheduled
    pub robots_fetches: u64,

    /// Downloads handed to the downloader, robots.txt included
    pub downloads_dispatched: u64,
}

impl CrawlReport {
    /// Creates a report starting now
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            cycles: 0,
            urls_received: 0,
            urls_accepted: 0,
            urls_dropped: 0,
            robots_fetches: 0,
            downloads_dispatched: 0,
        }
    }

    /// Adds the counts of one grouped batch
    pub fn record_grouping(&mut self, summary: &GroupingSummary) {
        self.urls_accepted += summary.accepted as u64;
        self.urls_dropped += summary.rejected as u64;
        self.robots_fetches += summary.robots as u64;
    }

    /// Marks the crawl as finished now
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall time of the crawl in seconds, if finished
    pub fn duration_seconds(&self) -> Option<f64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_milliseconds() as f64 / 1000.0)
    }

    /// Downloads of the caller's URLs, robots.txt excluded
    pub fn page_downloads(&self) -> u64 {
        self.downloads_dispatched.saturating_sub(self.robots_fetches)
    }
}

impl Default for CrawlReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints a report to stdout in a formatted manner
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    println!("Timing:");
    println!("  Started: {}", report.started_at.to_rfc3339());
    match (report.finished_at, report.duration_seconds()) {
        (Some(finished), Some(seconds)) => {
            println!("  Finished: {}", finished.to_rfc3339());
            println!("  Duration: {:.1}s", seconds);
        }
        _ => println!("  Finished: (still running)"),
    }
    println!();

    println!("URLs:");
    println!("  Received: {}", report.urls_received);
    println!("  Accepted: {}", report.urls_accepted);
    println!("  Dropped: {}", report.urls_dropped);
    println!();

    println!("Downloads:");
    println!("  Cycles: {}", report.cycles);
    println!("  Robots.txt fetches: {}", report.robots_fetches);
    println!("  Pages: {}", report.page_downloads());
    println!("  Total dispatched: {}", report.downloads_dispatched);

    if report.urls_accepted > 0 {
        // Disallowed URLs are never dispatched
        let disallowed = report.urls_accepted.saturating_sub(report.page_downloads());
        println!(
            "\nDisallowed by robots.txt: {} ({:.1}%)",
            disallowed,
            disallowed as f64 / report.urls_accepted as f64 * 100.0
        );
    }
}
