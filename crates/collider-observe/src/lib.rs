// Iron Lotus: Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # collider-observe
//!
//! Thread introspection for the threads collider.
//!
//! This crate provides:
//! - **Thread inspection**: scheduler state and kernel wait channel of the
//!   threads of the current process, read from `/proc/self/task`
//! - **Deadlock probe**: a report of threads that failed to finish, with
//!   wait-for cycles when `parking_lot` deadlock detection is compiled in
//!
//! ## Example
//!
//! ```rust
//! use collider_observe::{DeadlockProbe, OsThreadId, WatchedThread};
//!
//! let watched = vec![WatchedThread {
//!     name: "collider-pool-0".to_string(),
//!     os: OsThreadId::current(),
//!     finished: false,
//! }];
//! let report = DeadlockProbe::listing_only().probe(&watched);
//! assert_eq!(report.unfinished.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod deadlock;
pub mod error;
pub mod task;

pub use deadlock::{
    BlockedThread, CycleDetection, CycleMember, DeadlockProbe, DeadlockReport, WaitCycle,
    WatchedThread,
};
pub use error::{ObserveError, Result};
pub use task::{OsThreadId, TaskInspector, TaskSnapshot, ThreadState};
