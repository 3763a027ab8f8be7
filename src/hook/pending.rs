//! Pending-work counter backing `flush`.
//!
//! Producers take a [`PendingTicket`] before a payload is admitted to the
//! queue. The ticket travels with the payload and decrements the counter when
//! dropped, so the count falls exactly once per payload whether it was
//! delivered, discarded, rejected by a closed channel or left behind in a
//! dropped queue. `wait_idle` blocks until the count returns to zero.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Default)]
pub struct PendingTracker {
    count: Mutex<usize>,
    drained: Condvar,
}

/// Outstanding unit of work; decrements the tracker on drop.
#[must_use = "dropping the ticket immediately marks the work as finished"]
pub struct PendingTicket {
    tracker: Arc<PendingTracker>,
}

impl Drop for PendingTicket {
    fn drop(&mut self) {
        self.tracker.decrement();
    }
}

impl std::fmt::Debug for PendingTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PendingTicket")
    }
}

impl PendingTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Count one more unit of work.
    pub fn admit(self: &Arc<Self>) -> PendingTicket {
        *self.count.lock() += 1;
        PendingTicket {
            tracker: Arc::clone(self),
        }
    }

    fn decrement(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    pub fn count(&self) -> usize {
        *self.count.lock()
    }

    /// Block until no work is pending.
    pub fn wait_idle(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.drained.wait(&mut count);
        }
    }

    /// Block until no work is pending or `timeout` elapses.
    ///
    /// Returns `true` if the counter reached zero.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.count.lock();
        while *count > 0 {
            if self.drained.wait_until(&mut count, deadline).timed_out() {
                return *count == 0;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::thread;

    #[rstest]
    fn idle_tracker_does_not_block() {
        let tracker = PendingTracker::new();
        tracker.wait_idle();
        assert!(tracker.wait_idle_timeout(Duration::ZERO));
    }

    #[rstest]
    fn wait_returns_after_last_ticket_drops() {
        let tracker = PendingTracker::new();
        let tickets: Vec<_> = (0..3).map(|_| tracker.admit()).collect();
        assert_eq!(tracker.count(), 3);
        let worker = thread::spawn(move || {
            for ticket in tickets {
                thread::sleep(Duration::from_millis(10));
                drop(ticket);
            }
        });
        tracker.wait_idle();
        assert_eq!(tracker.count(), 0);
        worker.join().expect("worker thread");
    }

    #[rstest]
    fn timeout_reports_outstanding_work() {
        let tracker = PendingTracker::new();
        let ticket = tracker.admit();
        assert!(!tracker.wait_idle_timeout(Duration::from_millis(20)));
        drop(ticket);
        assert!(tracker.wait_idle_timeout(Duration::from_millis(20)));
    }

    #[rstest]
    fn tickets_inside_a_dropped_channel_are_released() {
        let tracker = PendingTracker::new();
        let (tx, rx) = crossbeam_channel::bounded(4);
        tx.send(tracker.admit()).expect("send");
        tx.send(tracker.admit()).expect("send");
        assert_eq!(tracker.count(), 2);
        drop(rx);
        drop(tx);
        assert_eq!(tracker.count(), 0);
    }
}
