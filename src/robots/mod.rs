//! Robots.txt handling module
//!
//! This module gates every host behind a robots.txt fetch and filters the
//! waiting URLs with the fetched rules.

mod filter;
mod groups;

pub use filter::RobotsFilter;
pub use groups::{schedule_robots, GroupingSummary, RobotsGroup};
