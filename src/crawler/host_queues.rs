//! Per-host download queues
//!
//! All schemes of a host share one queue. A queue that exists is read by the
//! control loop as "this host still has work", so queues are erased as soon as
//! they run dry and nothing is in flight for them.

use crate::crawler::request::PreparedRequest;
use crate::SchedulingError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Stable handle naming one host queue
///
/// Handles are host names, so they stay valid while other hosts are inserted
/// or erased, and can be sent across threads inside finished actions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostId(Arc<str>);

impl HostId {
    pub fn new(host: &str) -> Self {
        Self(Arc::from(host))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mapping from host to its pending requests
#[derive(Debug, Default)]
pub struct HostQueueTable {
    queues: BTreeMap<HostId, Vec<PreparedRequest>>,
}

impl HostQueueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle of the host's queue, creating an empty queue if needed
    pub fn queue_for(&mut self, host: &str) -> HostId {
        let id = HostId::new(host);
        self.queues.entry(id.clone()).or_default();
        id
    }

    /// Appends a request to a host's queue
    ///
    /// Recreates the queue if it was erased in the meantime.
    pub fn push(&mut self, host: &HostId, request: PreparedRequest) {
        self.queues.entry(host.clone()).or_default().push(request);
    }

    /// Removes the most recently added request of a host
    pub fn pop(&mut self, host: &HostId) -> Result<PreparedRequest, SchedulingError> {
        let queue = self
            .queues
            .get_mut(host)
            .ok_or_else(|| SchedulingError::UnknownHost {
                host: host.to_string(),
            })?;
        queue.pop().ok_or_else(|| SchedulingError::EmptyQueue {
            host: host.to_string(),
        })
    }

    /// Drops a host's queue
    ///
    /// Only empty queues may be erased; pending requests would be lost otherwise.
    pub fn erase(&mut self, host: &HostId) {
        debug_assert!(
            self.is_queue_empty(host),
            "erasing non-empty queue of {}",
            host
        );
        self.queues.remove(host);
    }

    /// Returns whether the host has no pending requests (true for unknown hosts)
    pub fn is_queue_empty(&self, host: &HostId) -> bool {
        self.queue_len(host) == 0
    }

    /// Number of pending requests of a host
    pub fn queue_len(&self, host: &HostId) -> usize {
        self.queues.get(host).map_or(0, Vec::len)
    }

    /// Returns whether no host queue exists
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Number of host queues
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    /// Iterates over the handles of all host queues in host order
    pub fn hosts(&self) -> impl Iterator<Item = &HostId> + '_ {
        self.queues.keys()
    }

    /// Iterates over every host with its pending requests
    pub fn iter(&self) -> impl Iterator<Item = (&HostId, &[PreparedRequest])> + '_ {
        self.queues
            .iter()
            .map(|(host, queue)| (host, queue.as_slice()))
    }
}
