//! Failure aggregation.
//!
//! Every failure of a run, whether raised by a worker body or synthesized
//! on timeout, goes into one [`ExceptionSink`]. Workers record into it
//! concurrently; the orchestrator drains it into the caller's observer on
//! its own thread, so the observer never runs concurrently with itself.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use collider_observe::DeadlockReport;
use parking_lot::Mutex;

use crate::action::BoxError;
use crate::types::WorkerId;

/// Caller-supplied observer receiving each failure.
pub type FailureObserver = Box<dyn FnMut(Failure) + Send>;

/// Error raised by a worker body.
#[derive(Debug)]
pub enum WorkerError {
    /// The body panicked; the panic message.
    Panic(String),
    /// The body returned an error.
    Error(BoxError),
}

impl WorkerError {
    /// Builds a panic failure from a `catch_unwind` payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panic(message)
    }

    /// Returns true if the body panicked.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::Panic(_))
    }
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Panic(message) => f.write_str(message),
            Self::Error(err) => write!(f, "{err}"),
        }
    }
}

/// Synthetic failure recorded when workers do not finish in time.
#[derive(Debug, Clone)]
pub struct UnfinishedThreads {
    /// Completion timeout that elapsed.
    pub timeout: Duration,
    /// Probe result for the unfinished workers.
    pub report: DeadlockReport,
}

impl fmt::Display for UnfinishedThreads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "There are unfinished threads.")?;
        writeln!(f, "Check if there are any deadlocks and fix them.")?;
        writeln!(
            f,
            "If there are no deadlocks, please increase timeout (was {}).",
            humantime::format_duration(self.timeout)
        )?;
        write!(f, "{}", self.report)
    }
}

impl std::error::Error for UnfinishedThreads {}

/// One recorded failure.
#[derive(Debug)]
pub enum Failure {
    /// A worker body panicked or returned an error.
    Worker {
        /// Worker that failed.
        worker: WorkerId,
        /// Name of the action the worker ran.
        action: Option<String>,
        /// What went wrong.
        error: WorkerError,
    },
    /// Workers were still running when the completion timeout elapsed.
    UnfinishedThreads(UnfinishedThreads),
}

impl Failure {
    /// Returns the failure message: the body's panic message or error text,
    /// or the full timeout diagnostic.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Worker { error, .. } => error.to_string(),
            Self::UnfinishedThreads(diagnostic) => diagnostic.to_string(),
        }
    }

    /// Returns the failing worker, for worker failures.
    #[must_use]
    pub const fn worker(&self) -> Option<WorkerId> {
        match self {
            Self::Worker { worker, .. } => Some(*worker),
            Self::UnfinishedThreads(_) => None,
        }
    }

    /// Returns the action name, for worker failures of named actions.
    #[must_use]
    pub fn action_name(&self) -> Option<&str> {
        match self {
            Self::Worker { action, .. } => action.as_deref(),
            Self::UnfinishedThreads(_) => None,
        }
    }

    /// Returns true for the timeout diagnostic.
    #[must_use]
    pub const fn is_unfinished_threads(&self) -> bool {
        matches!(self, Self::UnfinishedThreads(_))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Worker {
                worker,
                action: Some(action),
                error,
            } => write!(f, "{worker} [{action}] failed: {error}"),
            Self::Worker {
                worker,
                action: None,
                error,
            } => write!(f, "{worker} failed: {error}"),
            Self::UnfinishedThreads(diagnostic) => write!(f, "{diagnostic}"),
        }
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Worker {
                error: WorkerError::Error(err),
                ..
            } => Some(err.as_ref()),
            Self::Worker { .. } => None,
            Self::UnfinishedThreads(diagnostic) => Some(diagnostic),
        }
    }
}

/// Thread-safe collector of failures.
#[derive(Debug, Default)]
pub struct ExceptionSink {
    pending: Mutex<Vec<Failure>>,
    recorded: AtomicUsize,
}

impl ExceptionSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure. Safe to call from any number of threads.
    pub fn record(&self, failure: Failure) {
        tracing::debug!(failure = %failure, "failure recorded");
        self.pending.lock().push(failure);
        self.recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// Delivers every pending failure to `observer`, one at a time, on the
    /// calling thread. Returns how many were delivered.
    ///
    /// Failures recorded while the observer runs are delivered by the same
    /// call. Each failure is delivered exactly once.
    pub fn drain(&self, observer: &mut dyn FnMut(Failure)) -> usize {
        let mut delivered = 0;
        loop {
            let batch = std::mem::take(&mut *self.pending.lock());
            if batch.is_empty() {
                return delivered;
            }
            delivered += batch.len();
            for failure in batch {
                observer(failure);
            }
        }
    }

    /// Returns the number of failures waiting to be drained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns true if nothing is waiting to be drained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Returns the number of failures ever recorded.
    #[must_use]
    pub fn total_recorded(&self) -> usize {
        self.recorded.load(Ordering::Relaxed)
    }
}
