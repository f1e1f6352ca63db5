//! Queue of finished-download actions
//!
//! Downloader callbacks run on arbitrary threads. They never touch scheduling
//! state directly; instead they push an action here, and the control loop
//! applies the actions in push order. Pending actions are swapped out under
//! the lock and run after it is released, so a handler may push again.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::Notify;

/// Thread-safe queue of actions waiting for the control loop
pub struct FinishedActionQueue<A> {
    actions: Mutex<Vec<A>>,
    notify: Notify,
}

impl<A> FinishedActionQueue<A> {
    /// Creates an empty queue
    pub fn new() -> Self {
        Self {
            actions: Mutex::new(Vec::new()),
            notify: Notify::new(),
        }
    }

    /// Appends an action and wakes the waiting control loop
    ///
    /// Callable from any thread.
    pub fn push(&self, action: A) {
        self.lock().push(action);
        self.notify.notify_one();
    }

    /// Waits until at least one action is queued, then runs every queued action
    ///
    /// Returns the number of actions run.
    pub async fn execute_or_wait_and_execute(&self, run: impl FnMut(A)) -> usize {
        loop {
            let pending = self.take();
            if !pending.is_empty() {
                return run_all(pending, run);
            }
            self.notify.notified().await;
        }
    }

    /// Like `execute_or_wait_and_execute`, but gives up waiting at `deadline`
    ///
    /// When the deadline passes with nothing queued, nothing runs and 0 is returned.
    pub async fn execute_or_wait_and_execute_or_wait_until(
        &self,
        deadline: Instant,
        run: impl FnMut(A),
    ) -> usize {
        let deadline = tokio::time::Instant::from_std(deadline);
        loop {
            let pending = self.take();
            if !pending.is_empty() {
                return run_all(pending, run);
            }
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return self.execute(run);
            }
        }
    }

    /// Runs whatever is queued right now without waiting
    pub fn execute(&self, run: impl FnMut(A)) -> usize {
        run_all(self.take(), run)
    }

    /// Number of actions waiting to run
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns whether no action is waiting
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn take(&self) -> Vec<A> {
        std::mem::take(&mut *self.lock())
    }

    // A panicking handler never holds this lock, so a poisoned queue is still consistent
    fn lock(&self) -> MutexGuard<'_, Vec<A>> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A> Default for FinishedActionQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

fn run_all<A>(pending: Vec<A>, mut run: impl FnMut(A)) -> usize {
    let count = pending.len();
    if count > 0 {
        tracing::trace!("Executing {} finished actions", count);
    }
    for action in pending {
        run(action);
    }
    count
}
