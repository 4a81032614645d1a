//! Completion tracking: a countdown of workers still running, with a bounded
//! wait for it to reach zero.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Result of waiting for completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every worker marked itself done before the deadline.
    Completed,
    /// The deadline elapsed first.
    TimedOut {
        /// Workers that had not marked themselves done.
        remaining: usize,
    },
}

/// Counts workers down to zero.
///
/// Invariant: `remaining` only decreases and reaches zero at most once.
#[derive(Debug)]
pub struct CompletionTracker {
    expected: usize,
    remaining: Mutex<usize>,
    all_done: Condvar,
}

impl CompletionTracker {
    /// Creates a tracker expecting `expected` workers.
    #[must_use]
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            remaining: Mutex::new(expected),
            all_done: Condvar::new(),
        }
    }

    /// Marks one worker done. Returns false, and changes nothing, if every
    /// expected worker was already marked.
    pub fn mark_done(&self) -> bool {
        let mut remaining = self.remaining.lock();
        if *remaining == 0 {
            tracing::warn!(expected = self.expected, "mark_done called after completion");
            return false;
        }
        *remaining -= 1;
        if *remaining == 0 {
            self.all_done.notify_all();
        }
        true
    }

    /// Blocks until every worker is done or `timeout` elapses.
    ///
    /// A timeout too large to represent as a deadline waits indefinitely.
    pub fn await_all(&self, timeout: Duration) -> Completion {
        let deadline = Instant::now().checked_add(timeout);
        let mut remaining = self.remaining.lock();

        while *remaining > 0 {
            match deadline {
                Some(deadline) => {
                    if self.all_done.wait_until(&mut remaining, deadline).timed_out() {
                        break;
                    }
                }
                None => self.all_done.wait(&mut remaining),
            }
        }

        match *remaining {
            0 => Completion::Completed,
            remaining => Completion::TimedOut { remaining },
        }
    }

    /// Returns the number of workers expected.
    #[must_use]
    pub const fn expected(&self) -> usize {
        self.expected
    }

    /// Returns the number of workers not yet done.
    #[must_use]
    pub fn remaining(&self) -> usize {
        *self.remaining.lock()
    }
}
