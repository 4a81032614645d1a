// Iron Lotus: Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # collider-core
//!
//! Concurrency-fault provocation primitives for the threads collider.
//!
//! A collision runs one or more [`Action`]s, each on a given number of
//! dedicated threads, and releases every thread at the same instant so that
//! their bodies overlap as much as the hardware allows. Races, lost updates
//! and lock-order deadlocks that hide under normal scheduling show up.
//!
//! - [`ArrivalBarrier`] holds workers at the start line and releases them
//!   together (spin wait, no sleeping)
//! - [`CompletionTracker`] waits, with a timeout, for every worker to finish
//! - [`ExceptionSink`] collects worker failures and delivers them to the
//!   caller's observer on one thread
//! - [`Collider`] orchestrates a run and, on timeout, reports the stuck
//!   workers through a [`collider_observe::DeadlockProbe`]
//!
//! ## Iron Lotus Framework
//!
//! - **Jidoka**: Worker failures are values, never unwinding into the pool
//! - **Poka-Yoke**: Invalid repetition counts are rejected before any
//!   thread starts
//! - **Genchi Genbutsu**: Timeout reports name the blocked threads and what
//!   they wait on
//!
//! ## Example
//!
//! ```rust
//! use collider_core::Collider;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let hits = Arc::new(AtomicUsize::new(0));
//! let h = Arc::clone(&hits);
//! let mut collider = Collider::threads(4, move || {
//!     h.fetch_add(1, Ordering::SeqCst);
//! })
//! .build()?;
//!
//! let report = collider.run()?;
//! assert!(report.is_clean());
//! assert_eq!(hits.load(Ordering::SeqCst), 4);
//! # Ok::<(), collider_core::ColliderError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod action;
pub mod barrier;
pub mod builder;
pub mod collider;
pub mod completion;
pub mod config;
pub mod error;
pub mod pool;
pub mod processors;
pub mod sink;
pub mod types;
pub mod worker;

pub use action::{Action, ActionSet, BoxError};
pub use barrier::{Arrival, ArrivalBarrier};
pub use builder::{ActionStep, ColliderBuilder};
pub use collider::Collider;
pub use completion::{Completion, CompletionTracker};
pub use config::{ColliderConfig, Settings};
pub use error::{ColliderError, ConfigurationError, Result};
pub use pool::{ShutdownOutcome, WorkerPool};
pub use processors::Processors;
pub use sink::{ExceptionSink, Failure, FailureObserver, UnfinishedThreads, WorkerError};
pub use types::{ColliderState, Outcome, RunId, RunReport, WorkerId};
pub use worker::WorkerRegistry;
