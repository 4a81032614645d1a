//! Thread inspection via the /proc filesystem.
//!
//! # Implementation
//!
//! On Linux, every thread of the current process is a task under
//! `/proc/self/task/{tid}`:
//! - `stat` - thread name (comm) and scheduler state
//! - `wchan` - kernel function the thread is sleeping in
//!
//! Other platforms have no equivalent we can read without privileges, so
//! inspection reports [`ObserveError::Unsupported`] and callers degrade to
//! what they already know about their threads.

use std::fmt;
use std::thread::ThreadId;

use serde::Serialize;

use crate::error::{ObserveError, Result};

/// Identity of a thread, as the kernel and the Rust runtime know it.
///
/// Captured by the thread itself (see [`OsThreadId::current`]) because the
/// kernel task id cannot be obtained from a `std::thread::Thread` handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct OsThreadId {
    /// Kernel task id (Linux `gettid`).
    pub tid: Option<i64>,
    /// Rust thread id, the id `parking_lot` reports for deadlocked threads.
    #[serde(skip)]
    pub thread: Option<ThreadId>,
}

impl OsThreadId {
    /// Returns the identity of the calling thread.
    #[must_use]
    pub fn current() -> Self {
        Self {
            tid: current_tid(),
            thread: Some(std::thread::current().id()),
        }
    }
}

#[cfg(target_os = "linux")]
fn current_tid() -> Option<i64> {
    // SAFETY: gettid takes no arguments and cannot fail
    #[allow(unsafe_code)]
    let tid = unsafe { libc::syscall(libc::SYS_gettid) };
    Some(tid as i64)
}

#[cfg(not(target_os = "linux"))]
fn current_tid() -> Option<i64> {
    None
}

/// Scheduler state of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ThreadState {
    /// Running or runnable.
    Running,
    /// Interruptible sleep (futex waits land here).
    Sleeping,
    /// Uninterruptible sleep, usually I/O.
    DiskWait,
    /// Zombie.
    Zombie,
    /// Stopped or traced.
    Stopped,
    /// State could not be read.
    Unknown,
}

impl ThreadState {
    /// Parses the single-letter state code from `/proc/.../stat`.
    #[must_use]
    pub fn from_code(code: char) -> Self {
        match code {
            'R' => Self::Running,
            'S' => Self::Sleeping,
            'D' => Self::DiskWait,
            'Z' => Self::Zombie,
            'T' | 't' => Self::Stopped,
            _ => Self::Unknown,
        }
    }

    /// Returns true if the thread is parked in the kernel rather than
    /// executing.
    #[must_use]
    pub const fn is_blocked(self) -> bool {
        matches!(self, Self::Sleeping | Self::DiskWait)
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Sleeping => "sleeping",
            Self::DiskWait => "disk-wait",
            Self::Zombie => "zombie",
            Self::Stopped => "stopped",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of one thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSnapshot {
    /// Kernel task id.
    pub tid: i64,
    /// Thread name as seen by the kernel (truncated to 15 bytes on Linux).
    pub comm: String,
    /// Scheduler state.
    pub state: ThreadState,
    /// Kernel wait channel, if the thread is sleeping in one.
    pub wait_channel: Option<String>,
}

/// Reads thread state for the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskInspector;

impl TaskInspector {
    /// Creates a new inspector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns true if this platform supports thread inspection.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        cfg!(target_os = "linux")
    }

    /// Lists the task ids of every thread in the current process.
    ///
    /// # Errors
    /// Returns an error if `/proc/self/task` cannot be read.
    #[cfg(target_os = "linux")]
    #[allow(clippy::unused_self)]
    pub fn list(&self) -> Result<Vec<i64>> {
        let mut tids = Vec::new();
        for entry in std::fs::read_dir("/proc/self/task")? {
            let entry = entry?;
            if let Some(tid) = entry.file_name().to_str().and_then(|s| s.parse().ok()) {
                tids.push(tid);
            }
        }
        tids.sort_unstable();
        Ok(tids)
    }

    /// Lists the task ids of every thread in the current process.
    ///
    /// # Errors
    /// Always returns [`ObserveError::Unsupported`] on this platform.
    #[cfg(not(target_os = "linux"))]
    #[allow(clippy::unused_self)]
    pub fn list(&self) -> Result<Vec<i64>> {
        Err(ObserveError::Unsupported)
    }

    /// Takes a snapshot of one thread of the current process.
    ///
    /// # Errors
    /// Returns an error if the thread no longer exists or its stat file is
    /// malformed.
    #[cfg(target_os = "linux")]
    #[allow(clippy::unused_self)]
    pub fn snapshot(&self, tid: i64) -> Result<TaskSnapshot> {
        let path = format!("/proc/self/task/{tid}/stat");
        let content = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ObserveError::inspect(format!("task {tid} not found"))
            } else {
                ObserveError::Io(e)
            }
        })?;
        let (comm, state) = Self::parse_stat_content(&content)?;

        // wchan is often masked to "0" without CAP_SYS_ADMIN
        let wait_channel = std::fs::read_to_string(format!("/proc/self/task/{tid}/wchan"))
            .ok()
            .and_then(|raw| parse_wait_channel(&raw));

        Ok(TaskSnapshot {
            tid,
            comm,
            state,
            wait_channel,
        })
    }

    /// Takes a snapshot of one thread of the current process.
    ///
    /// # Errors
    /// Always returns [`ObserveError::Unsupported`] on this platform.
    #[cfg(not(target_os = "linux"))]
    #[allow(clippy::unused_self)]
    pub fn snapshot(&self, _tid: i64) -> Result<TaskSnapshot> {
        Err(ObserveError::Unsupported)
    }

    /// Parses the content of `/proc/{pid}/task/{tid}/stat` into the thread
    /// name and state.
    ///
    /// Format: `tid (comm) state ppid ...`. The name may itself contain
    /// spaces and parentheses, so the last `)` ends it.
    pub fn parse_stat_content(content: &str) -> Result<(String, ThreadState)> {
        let comm_start = content
            .find('(')
            .ok_or_else(|| ObserveError::inspect("malformed stat: no opening paren"))?;
        let comm_end = content
            .rfind(')')
            .ok_or_else(|| ObserveError::inspect("malformed stat: no closing paren"))?;
        if comm_end < comm_start {
            return Err(ObserveError::inspect("malformed stat: parens out of order"));
        }

        let comm = content[comm_start + 1..comm_end].to_string();
        let state = content[comm_end + 1..]
            .split_whitespace()
            .next()
            .and_then(|field| field.chars().next())
            .map(ThreadState::from_code)
            .ok_or_else(|| ObserveError::inspect("malformed stat: missing state"))?;

        Ok((comm, state))
    }
}

/// Normalizes a raw wchan value; "0" and empty mean "not waiting".
fn parse_wait_channel(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "0" {
        None
    } else {
        Some(trimmed.to_string())
    }
}
