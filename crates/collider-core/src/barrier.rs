//! Arrival barrier: holds every worker at the start line until the last one
//! arrives, then releases them all at once.
//!
//! # Why spin
//!
//! Workers wait by spinning on an atomic flag instead of parking on a
//! condition variable. Wake-ups after a notify are spread over tens of
//! microseconds to milliseconds depending on the scheduler, which is the
//! very skew the barrier exists to remove. A spinning worker stays on its
//! core and sees the flag flip within a cache-line transfer.
//!
//! The cost is CPU: every waiting worker burns a core until release. The
//! wait lasts as long as the slowest thread takes to start, usually well
//! under a millisecond. Every [`YIELD_EVERY`] spins a worker yields once so
//! that hosts with fewer cores than workers still schedule the latecomers.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

/// Spins between cooperative yields while waiting for release.
pub const YIELD_EVERY: u32 = 4096;

/// How a worker left the barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// All participants arrived; run the action.
    Released,
    /// The run was aborted before every participant arrived; skip the action.
    Aborted,
}

/// Single-use arrival barrier for a fixed number of participants.
///
/// Invariant: `released` goes from false to true exactly once, only after
/// `arrived == expected`, and is never reset.
#[derive(Debug)]
pub struct ArrivalBarrier {
    expected: usize,
    arrived: AtomicUsize,
    released: AtomicBool,
    aborted: AtomicBool,
    released_at: OnceLock<Instant>,
}

impl ArrivalBarrier {
    /// Creates a barrier for `expected` participants.
    ///
    /// A barrier for zero participants is released from the start.
    #[must_use]
    pub fn new(expected: usize) -> Self {
        let barrier = Self {
            expected,
            arrived: AtomicUsize::new(0),
            released: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
            released_at: OnceLock::new(),
        };
        if expected == 0 {
            barrier.release();
        }
        barrier
    }

    /// Registers the caller's arrival and spins until every participant has
    /// arrived (or the barrier is aborted).
    ///
    /// Must be called at most once per participant.
    pub fn arrive(&self) -> Arrival {
        let arrived = self.arrived.fetch_add(1, Ordering::AcqRel) + 1;
        if arrived == self.expected {
            self.release();
            tracing::debug!(participants = self.expected, "arrival barrier released");
        }

        let mut spins: u32 = 0;
        loop {
            if self.released.load(Ordering::Acquire) {
                return Arrival::Released;
            }
            if self.aborted.load(Ordering::Acquire) {
                return Arrival::Aborted;
            }
            std::hint::spin_loop();
            spins = spins.wrapping_add(1);
            if spins % YIELD_EVERY == 0 {
                std::thread::yield_now();
            }
        }
    }

    fn release(&self) {
        // Recorded before the flag so every released worker observes it.
        let _ = self.released_at.set(Instant::now());
        self.released.store(true, Ordering::Release);
    }

    /// Lets waiting participants leave without being released.
    ///
    /// Used when the run cannot launch every participant. Has no effect on
    /// an already released barrier.
    pub fn abort(&self) {
        if !self.is_released() {
            self.aborted.store(true, Ordering::Release);
        }
    }

    /// Returns the number of participants expected.
    #[must_use]
    pub const fn expected(&self) -> usize {
        self.expected
    }

    /// Returns how many participants have arrived so far.
    #[must_use]
    pub fn arrived(&self) -> usize {
        self.arrived.load(Ordering::Acquire)
    }

    /// Returns true once the barrier has released its participants.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Returns true if the barrier was aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Returns the instant of release, if it happened.
    #[must_use]
    pub fn released_at(&self) -> Option<Instant> {
        if self.is_released() {
            self.released_at.get().copied()
        } else {
            None
        }
    }
}
