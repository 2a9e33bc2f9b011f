//! The batch-completion latch.
//!
//! In the abstract, a latch blocks some logic from progressing until it is
//! "opened". The [`CountLatch`] here begins closed with a count of pending
//! units and opens when the count reaches zero: the write side is
//! [`CountLatch::count_down`], called once by every finished unit, and the
//! read side is the pair of blocking waits the runner parks on while a
//! dispatched batch drains.
//!
//! Unlike a spin-and-probe latch, this one always blocks on a condvar, since
//! the runner has nothing useful to do between dispatching a batch and
//! seeing it finish. The timed wait is deadline-based so that spurious
//! wakeups cannot stretch the overall wait beyond the caller's budget.

use std::time::{Duration, Instant};

use crossbeam_utils::CachePadded;
use parking_lot::{Condvar, Mutex};

// -----------------------------------------------------------------------------
// Counting latch

/// A latch that opens once a fixed number of completions have been recorded.
pub struct CountLatch {
    /// Completions still outstanding before the latch opens. Padded because
    /// unit threads on other cores write it while the runner's core polls it.
    remaining: CachePadded<Mutex<usize>>,
    /// Signalled by the `count_down` call that opens the latch.
    opened: Condvar,
}

impl CountLatch {
    /// Creates a latch that opens after `count` completions. A zero count
    /// creates an already-open latch.
    pub fn with_count(count: usize) -> CountLatch {
        CountLatch {
            remaining: CachePadded::new(Mutex::new(count)),
            opened: Condvar::new(),
        }
    }

    /// Records one completion. The call that brings the count to zero opens
    /// the latch and wakes every waiter. An open latch absorbs further calls
    /// without effect.
    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.opened.notify_all();
        }
    }

    /// Returns `true` if the latch is open.
    pub fn is_open(&self) -> bool {
        *self.remaining.lock() == 0
    }

    /// Blocks the calling thread until the latch opens.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            self.opened.wait(&mut remaining);
        }
    }

    /// Blocks the calling thread until the latch opens or `budget` elapses,
    /// whichever comes first. Returns `true` if the latch opened in time.
    ///
    /// The budget is converted to an absolute deadline on entry. An already
    /// open latch reports `true` even with a zero budget; a still-closed
    /// latch with a zero budget reports `false` without sleeping.
    pub fn wait_for(&self, budget: Duration) -> bool {
        let deadline = Instant::now() + budget;
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            if self.opened.wait_until(&mut remaining, deadline).timed_out() {
                return *remaining == 0;
            }
        }
        true
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::thread;

    #[test]
    fn zero_count_is_already_open() {
        let latch = CountLatch::with_count(0);
        assert!(latch.is_open());
        latch.wait();
        assert!(latch.wait_for(Duration::ZERO));
    }

    #[test]
    fn opens_after_the_last_count_down() {
        let latch = CountLatch::with_count(2);
        latch.count_down();
        assert!(!latch.is_open());
        latch.count_down();
        assert!(latch.is_open());
    }

    #[test]
    fn closed_latch_fails_a_zero_budget_wait_immediately() {
        let latch = CountLatch::with_count(1);
        let started = Instant::now();
        assert!(!latch.wait_for(Duration::ZERO));
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn timed_wait_observes_a_cross_thread_count_down() {
        let latch = Arc::new(CountLatch::with_count(1));
        let remote = Arc::clone(&latch);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.count_down();
        });
        assert!(latch.wait_for(Duration::from_secs(5)));
    }

    #[test]
    fn timed_wait_gives_up_on_a_latch_nobody_opens() {
        let latch = CountLatch::with_count(1);
        let started = Instant::now();
        assert!(!latch.wait_for(Duration::from_millis(50)));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
