//! Ready-time heap for host queues
//!
//! Each entry says "the next request of this host may start at this instant".
//! The request itself is only popped from the host queue when the entry fires,
//! since the queue can grow between scheduling and firing.

use crate::crawler::host_queues::{HostId, HostQueueTable};
use crate::crawler::request::PreparedRequest;
use crate::SchedulingError;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// A host whose next request becomes ready at `ready_at`
#[derive(Debug, Clone)]
struct ReadyEntry {
    ready_at: Instant,
    host: HostId,
}

// Reverse comparison so the earliest ready time is popped first from BinaryHeap.
// Ties are left in arbitrary order.
impl Ord for ReadyEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.ready_at.cmp(&self.ready_at)
    }
}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ReadyEntry {
    fn eq(&self, other: &Self) -> bool {
        self.ready_at == other.ready_at
    }
}

impl Eq for ReadyEntry {}

/// Min-heap of host queues keyed by the time their next request may start
#[derive(Debug, Default)]
pub struct ReadyTimeHeap {
    heap: BinaryHeap<ReadyEntry>,
}

impl ReadyTimeHeap {
    /// Creates an empty heap
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a heap with one entry per host, all ready now
    pub fn seeded<'a>(hosts: impl IntoIterator<Item = &'a HostId>) -> Self {
        let now = Instant::now();
        let heap = hosts
            .into_iter()
            .map(|host| ReadyEntry {
                ready_at: now,
                host: host.clone(),
            })
            .collect();
        Self { heap }
    }

    /// Schedules the host's next request `delay` from now
    pub fn push(&mut self, host: HostId, delay: Duration) {
        self.heap.push(ReadyEntry {
            ready_at: Instant::now() + delay,
            host,
        });
    }

    /// Removes the earliest entry and pops the next request from its host queue
    pub fn pop(&mut self, table: &mut HostQueueTable) -> Result<PreparedRequest, SchedulingError> {
        let entry = self.heap.pop().ok_or(SchedulingError::EmptyHeap)?;
        table.pop(&entry.host)
    }

    /// The ready time of the earliest entry
    pub fn top_time(&self) -> Result<Instant, SchedulingError> {
        self.heap
            .peek()
            .map(|entry| entry.ready_at)
            .ok_or(SchedulingError::EmptyHeap)
    }

    /// Returns whether the earliest entry is ready at `now`
    pub fn is_ready(&self, now: Instant) -> bool {
        self.heap.peek().is_some_and(|entry| entry.ready_at <= now)
    }

    /// Returns whether the heap is empty
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of scheduled entries
    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
