//! Worker wrapper and registry.
//!
//! Each pool thread runs one [`WorkerTask`]: register, wait at the arrival
//! barrier, run the action body once under `catch_unwind`, route any failure
//! to the sink, mark done. The registry keeps what the deadlock probe and the
//! run report need to know about every worker.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use collider_observe::{OsThreadId, WatchedThread};

use crate::action::Action;
use crate::barrier::{Arrival, ArrivalBarrier};
use crate::completion::CompletionTracker;
use crate::sink::{ExceptionSink, Failure, WorkerError};
use crate::types::WorkerId;

/// Prefix of every pool thread name.
pub const THREAD_NAME_PREFIX: &str = "collider-pool-";

/// Builds the pool thread name for worker `index`.
#[must_use]
pub fn thread_name(index: usize, action_name: Option<&str>) -> String {
    match action_name {
        Some(name) => format!("{THREAD_NAME_PREFIX}{index} [{name}]"),
        None => format!("{THREAD_NAME_PREFIX}{index}"),
    }
}

#[derive(Debug)]
struct Slot {
    name: String,
    os: OnceLock<OsThreadId>,
    started_at: OnceLock<Instant>,
    finished: AtomicBool,
}

/// Per-run record of every worker.
#[derive(Debug)]
pub struct WorkerRegistry {
    slots: Vec<Slot>,
}

impl WorkerRegistry {
    /// Creates a registry with one slot per thread name, indexed by worker.
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        Self {
            slots: names
                .into_iter()
                .map(|name| Slot {
                    name,
                    os: OnceLock::new(),
                    started_at: OnceLock::new(),
                    finished: AtomicBool::new(false),
                })
                .collect(),
        }
    }

    /// Returns the number of workers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the registry has no workers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn register_current(&self, index: usize) {
        if let Some(slot) = self.slots.get(index) {
            let _ = slot.os.set(OsThreadId::current());
        }
    }

    fn mark_started(&self, index: usize) {
        if let Some(slot) = self.slots.get(index) {
            let _ = slot.started_at.set(Instant::now());
        }
    }

    fn mark_finished(&self, index: usize) {
        if let Some(slot) = self.slots.get(index) {
            slot.finished.store(true, Ordering::Release);
        }
    }

    /// Returns the number of workers that have not finished.
    #[must_use]
    pub fn unfinished(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| !s.finished.load(Ordering::Acquire))
            .count()
    }

    /// Earliest body start, across workers that got past the barrier.
    #[must_use]
    pub fn first_start(&self) -> Option<Instant> {
        self.slots.iter().filter_map(|s| s.started_at.get().copied()).min()
    }

    /// Time between the first and the last body start.
    #[must_use]
    pub fn start_spread(&self) -> Option<Duration> {
        let starts = self.slots.iter().filter_map(|s| s.started_at.get().copied());
        let (min, max) = starts.fold((None, None), |(min, max), t| {
            (
                Some(min.map_or(t, |m: Instant| m.min(t))),
                Some(max.map_or(t, |m: Instant| m.max(t))),
            )
        });
        Some(max?.duration_since(min?))
    }

    /// Snapshot of every worker, in the form the deadlock probe takes.
    #[must_use]
    pub fn watched(&self) -> Vec<WatchedThread> {
        self.slots
            .iter()
            .map(|s| WatchedThread {
                name: s.name.clone(),
                os: s.os.get().copied().unwrap_or_default(),
                finished: s.finished.load(Ordering::Acquire),
            })
            .collect()
    }
}

/// Everything one worker needs, moved onto its pool thread.
pub(crate) struct WorkerTask {
    pub(crate) id: WorkerId,
    pub(crate) action: Action,
    pub(crate) barrier: Arc<ArrivalBarrier>,
    pub(crate) tracker: Arc<CompletionTracker>,
    pub(crate) sink: Arc<ExceptionSink>,
    pub(crate) registry: Arc<WorkerRegistry>,
}

/// Marks the worker done even if the body unwinds past `catch_unwind`
/// (e.g. a panicking `Drop` of its payload).
struct DoneGuard<'a> {
    index: usize,
    tracker: &'a CompletionTracker,
    registry: &'a WorkerRegistry,
}

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        self.registry.mark_finished(self.index);
        self.tracker.mark_done();
    }
}

impl WorkerTask {
    /// Runs the worker on the calling thread.
    pub(crate) fn run(self) {
        let _done = DoneGuard {
            index: self.id.index,
            tracker: &self.tracker,
            registry: &self.registry,
        };
        self.registry.register_current(self.id.index);

        if self.barrier.arrive() == Arrival::Aborted {
            tracing::debug!(worker = %self.id, "run aborted before release");
            return;
        }
        self.registry.mark_started(self.id.index);

        let error = match panic::catch_unwind(AssertUnwindSafe(|| self.action.invoke())) {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(WorkerError::Error(err)),
            Err(payload) => Some(WorkerError::from_panic(payload.as_ref())),
        };

        // Recorded before the guard marks the worker done, so a completed
        // run has every failure in the sink.
        if let Some(error) = error {
            self.sink.record(Failure::Worker {
                worker: self.id,
                action: self.action.name().map(str::to_string),
                error,
            });
        }
    }
}
