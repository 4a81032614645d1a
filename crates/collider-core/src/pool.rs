//! Fixed-capacity worker pool: one named OS thread per submitted job.
//!
//! The pool is sized once, to the run's total worker count, so every
//! worker has its own thread and can reach the arrival barrier at the same
//! time as the others. Rust threads cannot be killed; on shutdown, threads
//! still running after the grace period are detached and reported.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{ColliderError, Result};

/// Poll interval while waiting for threads to finish during shutdown.
const JOIN_POLL: Duration = Duration::from_millis(1);

/// Result of shutting the pool down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownOutcome {
    /// Threads that finished and were joined.
    pub joined: usize,
    /// Names of threads still running at the end of the grace period.
    pub abandoned: Vec<String>,
}

impl ShutdownOutcome {
    /// Returns true if every thread was joined.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.abandoned.is_empty()
    }
}

/// Pool of dedicated worker threads.
#[derive(Debug)]
pub struct WorkerPool {
    capacity: usize,
    threads: Vec<(String, JoinHandle<()>)>,
    accepting: bool,
}

impl WorkerPool {
    /// Creates a pool that accepts up to `capacity` jobs.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            threads: Vec::with_capacity(capacity),
            accepting: true,
        }
    }

    /// Returns the pool capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of threads spawned and not yet joined.
    #[must_use]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    /// Returns true if no thread is held by the pool.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Returns true until the pool is shut down.
    #[must_use]
    pub const fn is_accepting(&self) -> bool {
        self.accepting
    }

    /// Spawns `job` on a new thread called `name`.
    ///
    /// # Errors
    /// Returns an orchestration error if the pool is full or shut down, or
    /// an I/O error if the OS refuses to create the thread.
    pub fn submit<F>(&mut self, name: String, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.accepting {
            return Err(ColliderError::orchestration("worker pool is shut down"));
        }
        if self.threads.len() >= self.capacity {
            return Err(ColliderError::orchestration(format!(
                "worker pool is full ({} threads)",
                self.capacity
            )));
        }

        let handle = thread::Builder::new().name(name.clone()).spawn(job)?;
        tracing::debug!(thread = %name, "pool thread spawned");
        self.threads.push((name, handle));
        Ok(())
    }

    /// Stops accepting jobs and joins every thread that finishes within
    /// `grace`. Threads still running afterwards are detached.
    pub fn shutdown(&mut self, grace: Duration) -> ShutdownOutcome {
        self.accepting = false;
        let deadline = Instant::now().checked_add(grace);
        let mut outcome = ShutdownOutcome::default();

        loop {
            let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.threads)
                .into_iter()
                .partition(|(_, handle)| handle.is_finished());
            self.threads = running;

            for (name, handle) in finished {
                if handle.join().is_err() {
                    tracing::warn!(thread = %name, "pool thread panicked outside its action");
                }
                outcome.joined += 1;
            }

            if self.threads.is_empty() || deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            thread::sleep(JOIN_POLL);
        }

        // dropping a JoinHandle detaches the thread
        for (name, _) in self.threads.drain(..) {
            outcome.abandoned.push(name);
        }
        if !outcome.abandoned.is_empty() {
            tracing::warn!(
                abandoned = outcome.abandoned.len(),
                threads = ?outcome.abandoned,
                "pool threads still running after shutdown grace period"
            );
        }
        outcome
    }
}
