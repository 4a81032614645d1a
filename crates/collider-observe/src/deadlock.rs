//! Deadlock probing for threads that failed to finish in time.
//!
//! The probe combines two sources:
//! - a listing of every watched thread that has not finished, enriched with
//!   its scheduler state and kernel wait channel where the host exposes them
//!   (see [`crate::task`]);
//! - wait-for cycles found by `parking_lot`'s deadlock detector, when the
//!   `deadlock-detection` feature is enabled.
//!
//! Without cycle detection the report only lists unfinished threads and
//! makes no claim that they form a cycle.

use std::fmt;

use serde::Serialize;

use crate::error::{ObserveError, Result};
use crate::task::{OsThreadId, TaskInspector, ThreadState};

/// Number of backtrace lines kept per deadlocked thread in the text report.
const BACKTRACE_LINES: usize = 16;

/// A thread the caller wants the probe to look at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchedThread {
    /// Diagnostic name.
    pub name: String,
    /// OS identity, captured by the thread itself.
    pub os: OsThreadId,
    /// Whether the thread finished its work.
    pub finished: bool,
}

/// An unfinished thread as seen by the probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedThread {
    /// Diagnostic name.
    pub name: String,
    /// Kernel task id, if known.
    pub tid: Option<i64>,
    /// Scheduler state.
    pub state: ThreadState,
    /// Kernel function the thread is waiting in, if exposed.
    pub wait_channel: Option<String>,
}

impl fmt::Display for BlockedThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(tid) = self.tid {
            write!(f, " (tid {tid})")?;
        }
        write!(f, ": {}", self.state)?;
        if let Some(channel) = &self.wait_channel {
            write!(f, ", waiting on {channel}")?;
        }
        Ok(())
    }
}

/// One thread taking part in a wait-for cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleMember {
    /// Watched thread name, if the thread belongs to the watched set.
    pub name: Option<String>,
    /// Thread id reported by the detector, in `ThreadId` debug form.
    pub thread_id: String,
    /// Backtrace of the blocking lock acquisition.
    pub backtrace: String,
}

/// A cycle in the wait-for graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitCycle {
    /// Threads in the cycle.
    pub members: Vec<CycleMember>,
}

/// Whether wait-for cycles could be searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleDetection {
    /// Cycles among `parking_lot` locks were searched for.
    ParkingLot,
    /// No cycle detector is available in this build.
    Unavailable,
}

/// Result of probing unfinished threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlockReport {
    /// Watched threads that had not finished.
    pub unfinished: Vec<BlockedThread>,
    /// Wait-for cycles found, if detection is available.
    pub cycles: Vec<WaitCycle>,
    /// Which cycle detector ran.
    pub cycle_detection: CycleDetection,
    /// Total threads in the process, where the host exposes it.
    pub process_threads: Option<usize>,
}

impl DeadlockReport {
    /// Returns true if a wait-for cycle was found.
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// Returns true if any unfinished thread is parked in the kernel.
    #[must_use]
    pub fn has_blocked_thread(&self) -> bool {
        self.unfinished.iter().any(|t| t.state.is_blocked())
    }

    /// Serializes the report to pretty JSON.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ObserveError::export(e.to_string()))
    }
}

impl fmt::Display for DeadlockReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Unfinished threads ({}):", self.unfinished.len())?;
        for thread in &self.unfinished {
            writeln!(f, "  - {thread}")?;
        }
        if let Some(total) = self.process_threads {
            writeln!(f, "Threads in process: {total}")?;
        }

        match self.cycle_detection {
            CycleDetection::Unavailable => {
                writeln!(f, "Deadlocked threads: cycle detection unavailable")?;
            }
            CycleDetection::ParkingLot if self.cycles.is_empty() => {
                writeln!(f, "Deadlocked threads: no parking_lot lock cycle found")?;
            }
            CycleDetection::ParkingLot => {
                writeln!(f, "Deadlocked threads ({} cycles):", self.cycles.len())?;
                for (i, cycle) in self.cycles.iter().enumerate() {
                    writeln!(f, "  cycle #{i}:")?;
                    for member in &cycle.members {
                        let name = member.name.as_deref().unwrap_or("<unwatched thread>");
                        writeln!(f, "    {name} ({})", member.thread_id)?;
                        for line in member.backtrace.lines().take(BACKTRACE_LINES) {
                            writeln!(f, "      {line}")?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Inspects unfinished threads after a timeout.
#[derive(Debug, Clone, Copy)]
pub struct DeadlockProbe {
    inspector: TaskInspector,
    cycle_detection: bool,
}

impl DeadlockProbe {
    /// Creates a new probe that searches for cycles when the build supports
    /// it.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inspector: TaskInspector::new(),
            cycle_detection: true,
        }
    }

    /// Creates a probe that only lists unfinished threads.
    ///
    /// The `parking_lot` detector is process-wide and reports each cycle
    /// once, so concurrent probes in one process can hide cycles from each
    /// other.
    #[must_use]
    pub const fn listing_only() -> Self {
        Self {
            inspector: TaskInspector::new(),
            cycle_detection: false,
        }
    }

    /// Probes the watched threads. Never fails: missing introspection
    /// degrades the report instead.
    #[must_use]
    pub fn probe(&self, watched: &[WatchedThread]) -> DeadlockReport {
        let unfinished: Vec<BlockedThread> = watched
            .iter()
            .filter(|w| !w.finished)
            .map(|w| self.describe(w))
            .collect();

        let (cycle_detection, cycles) = if self.cycle_detection {
            detect_cycles(watched)
        } else {
            (CycleDetection::Unavailable, Vec::new())
        };
        let process_threads = if self.inspector.is_supported() {
            self.inspector.list().ok().map(|tids| tids.len())
        } else {
            None
        };

        tracing::warn!(
            unfinished = unfinished.len(),
            cycles = cycles.len(),
            "deadlock probe finished"
        );

        DeadlockReport {
            unfinished,
            cycles,
            cycle_detection,
            process_threads,
        }
    }

    fn describe(&self, watched: &WatchedThread) -> BlockedThread {
        let snapshot = watched
            .os
            .tid
            .map(|tid| self.inspector.snapshot(tid))
            .transpose();

        match snapshot {
            Ok(Some(snapshot)) => BlockedThread {
                name: watched.name.clone(),
                tid: Some(snapshot.tid),
                state: snapshot.state,
                wait_channel: snapshot.wait_channel,
            },
            Ok(None) => BlockedThread {
                name: watched.name.clone(),
                tid: None,
                state: ThreadState::Unknown,
                wait_channel: None,
            },
            Err(e) => {
                tracing::debug!(thread = %watched.name, error = %e, "thread snapshot failed");
                BlockedThread {
                    name: watched.name.clone(),
                    tid: watched.os.tid,
                    state: ThreadState::Unknown,
                    wait_channel: None,
                }
            }
        }
    }
}

impl Default for DeadlockProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "deadlock-detection")]
fn detect_cycles(watched: &[WatchedThread]) -> (CycleDetection, Vec<WaitCycle>) {
    let cycles = parking_lot::deadlock::check_deadlock()
        .into_iter()
        .map(|threads| WaitCycle {
            members: threads
                .iter()
                .map(|thread| {
                    let thread_id = thread.thread_id();
                    CycleMember {
                        name: watched
                            .iter()
                            .find(|w| w.os.thread == Some(thread_id))
                            .map(|w| w.name.clone()),
                        thread_id: format!("{thread_id:?}"),
                        backtrace: format!("{:?}", thread.backtrace()),
                    }
                })
                .collect(),
        })
        .collect();
    (CycleDetection::ParkingLot, cycles)
}

#[cfg(not(feature = "deadlock-detection"))]
fn detect_cycles(_watched: &[WatchedThread]) -> (CycleDetection, Vec<WaitCycle>) {
    (CycleDetection::Unavailable, Vec::new())
}
