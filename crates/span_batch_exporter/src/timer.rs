//! Delayed-flush timer.
//!
//! [`FlushTimer`] owns at most one pending timer task. Scheduling cancels the
//! previous one first; cancelling aborts the task. A timer that fires must call
//! [`FlushTimer::complete`] with its id before acting, which fails if the timer
//! was cancelled or replaced in the meantime.

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Identifies one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(u64);

#[derive(Debug)]
struct PendingTimer {
    id: TimerId,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
pub struct FlushTimer {
    pending: Option<PendingTimer>,
    next_id: u64,
}

impl FlushTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a timer that runs `on_expiry` after `delay`, replacing any pending one.
    pub fn schedule<F>(&mut self, runtime: &Handle, delay: Duration, on_expiry: F) -> TimerId
    where
        F: FnOnce(TimerId) + Send + 'static,
    {
        self.cancel();

        self.next_id += 1;
        let id = TimerId(self.next_id);
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            on_expiry(id);
        });
        self.pending = Some(PendingTimer { id, handle });
        id
    }

    /// Aborts the pending timer, if any. Returns true if one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Clears the handle of a timer that has fired.
    ///
    /// Returns false if `id` is no longer the pending timer.
    pub fn complete(&mut self, id: TimerId) -> bool {
        if self.pending.as_ref().is_some_and(|timer| timer.id == id) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for FlushTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
