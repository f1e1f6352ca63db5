//! Crawler module for polite, concurrency-bounded downloading
//!
//! This module contains the scheduling core:
//! - the finished-action queue bridging download callbacks to the control loop
//! - per-host download queues and the ready-time heap spacing them out
//! - the coordinator running crawl cycles under a global download cap
//! - a reqwest-backed `Downloader`

mod action_queue;
mod coordinator;
mod fetcher;
mod host_queues;
mod request;
mod time_heap;

pub use action_queue::FinishedActionQueue;
pub use coordinator::{crawl_once, CrawlSettings, Crawler, FinishedAction};
pub use fetcher::{build_http_client, fetch_url, DownloadLimits, ReqwestDownloader};
pub use host_queues::{HostId, HostQueueTable};
pub use request::{DownloadResult, Downloader, MediaType, PreparedRequest, Request, ResultCallback};
pub use time_heap::ReadyTimeHeap;
