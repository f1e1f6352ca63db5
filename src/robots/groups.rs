//! Robots.txt gating of a URL batch
//!
//! A batch is split into groups sharing a (scheme, host) pair. Each group gets
//! one robots.txt request, queued on the host's queue; the group's own requests
//! stay aside until that fetch completes and the control loop releases them.

use crate::crawler::{
    DownloadResult, FinishedAction, FinishedActionQueue, HostId, HostQueueTable,
    PreparedRequest, Request,
};
use crate::robots::RobotsFilter;
use crate::url::{robots_txt_url, split_url};
use std::collections::HashMap;
use std::sync::Arc;

/// Identity of one robots.txt fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Robot {
    scheme: String,
    host: String,
}

/// Counts produced while grouping one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupingSummary {
    /// Requests parked behind a robots.txt fetch
    pub accepted: usize,

    /// Requests dropped because their URL is not crawlable
    pub rejected: usize,

    /// Robots.txt requests queued, one per (scheme, host)
    pub robots: usize,
}

/// Requests of one (scheme, host) pair waiting for their robots.txt
#[derive(Debug)]
pub struct RobotsGroup {
    host: HostId,
    agent: Arc<str>,
    requests: Vec<PreparedRequest>,
}

impl RobotsGroup {
    /// Number of requests held by the group
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Returns whether the group holds no request
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Moves the requests allowed by `robots` into the host queue
    ///
    /// A failed or empty robots.txt allows everything. Every released request
    /// reports its own completion to `finished`. Returns the number released.
    pub fn release(
        self,
        table: &mut HostQueueTable,
        robots: &DownloadResult,
        finished: &Arc<FinishedActionQueue<FinishedAction>>,
    ) -> usize {
        let filter = if robots.success && !robots.content.is_empty() {
            RobotsFilter::new(&self.agent, &robots.text())
        } else {
            tracing::debug!(
                "No usable robots.txt at {} ({}), allowing all",
                robots.url,
                if robots.success { "empty" } else { robots.error_message.as_str() }
            );
            RobotsFilter::allow_all(&self.agent)
        };

        let mut released = 0;
        for prepared in self.requests {
            if !filter.can_download(prepared.url()) {
                tracing::info!("URL {} disallowed by robots.txt", prepared.url());
                continue;
            }
            table.push(&self.host, notify_on_completion(prepared, &self.host, finished));
            released += 1;
        }

        tracing::debug!("Released {} requests for host {}", released, self.host);
        released
    }
}

/// Splits a batch into robots.txt groups and queues one robots.txt request per group
///
/// Requests with URLs the crawler cannot schedule are dropped without
/// invoking their callbacks. `agent` is the name robots.txt rules are matched
/// against.
pub fn schedule_robots(
    table: &mut HostQueueTable,
    requests: Vec<Request>,
    agent: &str,
    finished: &Arc<FinishedActionQueue<FinishedAction>>,
) -> GroupingSummary {
    tracing::debug!("Building host queues for {} requests", requests.len());

    let mut summary = GroupingSummary::default();
    let mut groups: HashMap<Robot, Vec<PreparedRequest>> = HashMap::new();

    for request in requests {
        let parts = match split_url(&request.url) {
            Ok(parts) => parts,
            Err(e) => {
                tracing::warn!("Dropping {}: {}", request.url, e);
                summary.rejected += 1;
                continue;
            }
        };

        let robot = Robot {
            scheme: parts.scheme.clone(),
            host: parts.host.clone(),
        };
        groups
            .entry(robot)
            .or_default()
            .push(PreparedRequest::new(request, parts.scheme, parts.host));
        summary.accepted += 1;
    }

    let agent: Arc<str> = Arc::from(agent);
    for (robot, requests) in groups {
        let host = table.queue_for(&robot.host);
        let group = RobotsGroup {
            host: host.clone(),
            agent: Arc::clone(&agent),
            requests,
        };

        let notify = Arc::clone(finished);
        let notify_host = host.clone();
        let robots_request = Request::new(
            robots_txt_url(&robot.scheme, &robot.host),
            0,
            move |result: DownloadResult| {
                notify.push(FinishedAction::RobotsFetched {
                    host: notify_host,
                    group,
                    result,
                });
            },
        );

        table.push(
            &host,
            PreparedRequest::new(robots_request, robot.scheme, robot.host),
        );
        summary.robots += 1;
    }

    tracing::debug!(
        "Queued {} robots.txt downloads across {} hosts, dropped {} URLs",
        summary.robots,
        table.len(),
        summary.rejected
    );
    summary
}

/// Chains a `Downloaded` notification after the request's own callback
fn notify_on_completion(
    prepared: PreparedRequest,
    host: &HostId,
    finished: &Arc<FinishedActionQueue<FinishedAction>>,
) -> PreparedRequest {
    let PreparedRequest {
        request,
        scheme,
        host: host_name,
    } = prepared;
    let Request { url, id, callback } = request;

    let notify = Arc::clone(finished);
    let host = host.clone();
    let wrapped = Request::new(url, id, move |result: DownloadResult| {
        callback(result);
        notify.push(FinishedAction::Downloaded { host });
    });

    PreparedRequest::new(wrapped, scheme, host_name)
}
