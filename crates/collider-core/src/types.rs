//! Core types for collisions.
//!
//! Per Iron Lotus Framework: UUIDs for stable IDs,
//! explicit state machines, no implicit transitions.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Unique identifier for one collision run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(uuid::Uuid);

impl RunId {
    /// Creates a new random run ID.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a worker inside a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId {
    /// Index among all workers of the run, also the pool thread index.
    pub index: usize,
    /// Index of the action this worker executes.
    pub action_index: usize,
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker-{} (action #{})", self.index, self.action_index)
    }
}

/// Collider lifecycle state.
///
/// ```text
/// Idle → Launching → AwaitingCompletion → Completed → Closed
///                                       ↘ TimedOut  ↗
/// ```
///
/// `close()` is accepted from any state and always ends in `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColliderState {
    /// Built, not yet run.
    Idle,
    /// Submitting workers to the pool.
    Launching,
    /// Workers released; waiting for them to finish.
    AwaitingCompletion,
    /// Every worker finished before the deadline.
    Completed,
    /// The deadline elapsed with workers still running.
    TimedOut,
    /// Pool released.
    Closed,
}

impl ColliderState {
    /// Returns true if a run finished (either way).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::TimedOut)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Every worker finished in time.
    Completed,
    /// Deadline elapsed; `unfinished` workers had not finished.
    TimedOut {
        /// Workers still running at the deadline.
        unfinished: usize,
    },
}

impl Outcome {
    /// Returns true if every worker finished in time.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Summary of one collision.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Run identifier, also attached to the run's tracing events.
    pub run_id: RunId,
    /// How the run ended.
    pub outcome: Outcome,
    /// Workers launched.
    pub total_workers: usize,
    /// Failures delivered to the observer during the run, including the
    /// timeout diagnostic.
    pub failures: usize,
    /// Instant the arrival barrier released the workers.
    pub released_at: Option<Instant>,
    /// Time between the first and the last body start.
    pub start_spread: Option<Duration>,
    /// Wall time from launch to the end of the completion wait.
    pub elapsed: Duration,
}

impl RunReport {
    /// Returns true if every worker finished in time and none failed.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.outcome.is_completed() && self.failures == 0
    }
}
