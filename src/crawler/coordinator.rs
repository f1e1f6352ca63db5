//! Crawler coordinator - the control loop
//!
//! The coordinator owns every piece of scheduling state: the host queues, the
//! ready heap and the in-flight counter. Downloads run elsewhere; their
//! completions come back as `FinishedAction` values through the finished-action
//! queue and are applied here, one at a time.
//!
//! A crawl is a sequence of cycles. Each cycle takes one batch from the
//! dispatcher, gates every host behind its robots.txt, then drains until no
//! queue, heap entry or active download is left.

use crate::config::{validate_max_active_downloads, Config};
use crate::crawler::action_queue::FinishedActionQueue;
use crate::crawler::host_queues::{HostId, HostQueueTable};
use crate::crawler::request::{DownloadResult, Downloader, Request};
use crate::crawler::time_heap::ReadyTimeHeap;
use crate::output::CrawlReport;
use crate::robots::{schedule_robots, RobotsGroup};
use crate::{ConfigError, SchedulingError, SumiError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Event pushed by a completion callback, applied on the control loop
#[derive(Debug)]
pub enum FinishedAction {
    /// A regular download of `host` completed
    Downloaded { host: HostId },

    /// The robots.txt of one group completed; its requests may be released
    RobotsFetched {
        host: HostId,
        group: RobotsGroup,
        result: DownloadResult,
    },
}

/// Values the control loop runs with
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Upper bound on downloads in flight, must be positive
    pub max_active_downloads: usize,

    /// Delay between the end of one download and the start of the next on a host
    pub per_host_timeout: Duration,

    /// Agent name robots.txt rules are matched against
    pub robots_agent: String,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_active_downloads: config.crawler.max_active_downloads,
            per_host_timeout: config.crawler.per_host_timeout(),
            robots_agent: config.user_agent.crawler_name.clone(),
        }
    }
}

/// Polite crawl driver
///
/// Pulls batches from the dispatcher while `keep_crawling` holds and hands
/// every download to the `Downloader`, keeping at most one download per host
/// and `max_active_downloads` overall in flight.
pub struct Crawler {
    settings: CrawlSettings,
    downloader: Arc<dyn Downloader>,
    dispatcher: Box<dyn FnMut() -> Vec<Request> + Send>,
    keep_crawling: Box<dyn FnMut() -> bool + Send>,
}

impl Crawler {
    /// Creates a new crawler
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` when `max_active_downloads` is zero.
    pub fn new(
        settings: CrawlSettings,
        downloader: Arc<dyn Downloader>,
        dispatcher: impl FnMut() -> Vec<Request> + Send + 'static,
        keep_crawling: impl FnMut() -> bool + Send + 'static,
    ) -> Result<Self, ConfigError> {
        validate_max_active_downloads(settings.max_active_downloads)?;

        Ok(Self {
            settings,
            downloader,
            dispatcher: Box::new(dispatcher),
            keep_crawling: Box::new(keep_crawling),
        })
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Runs cycles until `keep_crawling` returns false
    ///
    /// Each cycle drains completely before the predicate is asked again.
    pub async fn crawl(&mut self) -> Result<CrawlReport, SumiError> {
        let mut report = CrawlReport::new();
        tracing::info!(
            "Starting crawl (max {} active downloads, {:?} per-host timeout)",
            self.settings.max_active_downloads,
            self.settings.per_host_timeout
        );

        while (self.keep_crawling)() {
            let batch = (self.dispatcher)();
            tracing::info!("Crawl cycle {}: {} URLs", report.cycles + 1, batch.len());
            report.cycles += 1;
            report.urls_received += batch.len() as u64;

            if let Err(e) = self.run_cycle(batch, &mut report).await {
                tracing::error!("Crawl aborted: {}", e);
                report.finish();
                return Err(e.into());
            }
        }

        report.finish();
        tracing::info!(
            "Crawl finished after {} cycles, {} downloads dispatched",
            report.cycles,
            report.downloads_dispatched
        );
        Ok(report)
    }

    async fn run_cycle(
        &mut self,
        batch: Vec<Request>,
        report: &mut CrawlReport,
    ) -> Result<(), SchedulingError> {
        let finished = Arc::new(FinishedActionQueue::new());
        let mut cycle = Cycle::new(self.settings.per_host_timeout);

        let summary = schedule_robots(
            &mut cycle.table,
            batch,
            &self.settings.robots_agent,
            &finished,
        );
        report.record_grouping(&summary);

        cycle.heap = ReadyTimeHeap::seeded(cycle.table.hosts());
        let max_active = self.settings.max_active_downloads;

        while !cycle.table.is_empty() || cycle.active_downloads > 0 || !cycle.heap.is_empty() {
            // Every heap entry must be backed by a host queue
            if cycle.table.is_empty() && !cycle.heap.is_empty() {
                return Err(SchedulingError::HeapOutlivedQueues {
                    pending: cycle.heap.len(),
                });
            }

            if cycle.active_downloads >= max_active || cycle.heap.is_empty() {
                finished
                    .execute_or_wait_and_execute(|action| cycle.apply(action, &finished))
                    .await;
                continue;
            }

            let top_time = cycle.heap.top_time()?;
            let now = Instant::now();
            if now < top_time {
                tracing::trace!("Next host ready in {:?}", top_time - now);
                finished
                    .execute_or_wait_and_execute_or_wait_until(top_time, |action| {
                        cycle.apply(action, &finished)
                    })
                    .await;
                continue;
            }

            loop {
                let prepared = cycle.heap.pop(&mut cycle.table)?;
                tracing::debug!("Downloading {}", prepared.url());
                self.downloader.download(prepared.into_request());
                cycle.active_downloads += 1;
                report.downloads_dispatched += 1;

                if cycle.active_downloads >= max_active || !cycle.heap.is_ready(now) {
                    break;
                }
            }

            finished.execute(|action| cycle.apply(action, &finished));
        }

        Ok(())
    }
}

/// Scheduling state of one crawl cycle
struct Cycle {
    table: HostQueueTable,
    heap: ReadyTimeHeap,
    active_downloads: usize,
    per_host_timeout: Duration,
}

impl Cycle {
    fn new(per_host_timeout: Duration) -> Self {
        Self {
            table: HostQueueTable::new(),
            heap: ReadyTimeHeap::new(),
            active_downloads: 0,
            per_host_timeout,
        }
    }

    /// Applies one finished download: requeue the host after its timeout, or retire it
    fn apply(&mut self, action: FinishedAction, finished: &Arc<FinishedActionQueue<FinishedAction>>) {
        let host = match action {
            FinishedAction::Downloaded { host } => host,
            FinishedAction::RobotsFetched {
                host,
                group,
                result,
            } => {
                group.release(&mut self.table, &result, finished);
                host
            }
        };

        if self.table.is_queue_empty(&host) {
            tracing::debug!("Host {} drained", host);
            self.table.erase(&host);
        } else {
            self.heap.push(host, self.per_host_timeout);
        }

        debug_assert!(self.active_downloads > 0, "finished action without active download");
        self.active_downloads = self.active_downloads.saturating_sub(1);
    }
}

/// Predicate that lets exactly one cycle run
pub fn crawl_once() -> impl FnMut() -> bool + Send + 'static {
    let mut crawled = false;
    move || !std::mem::replace(&mut crawled, true)
}
