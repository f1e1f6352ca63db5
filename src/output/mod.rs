//! Output module for crawl results and reports
//!
//! This module handles:
//! - Writing every download result to its own file
//! - Recording and printing crawl statistics

pub mod stats;
mod writer;

pub use stats::{print_report, CrawlReport};
pub use writer::{ResultSender, ResultWriter, WriteSummary};
