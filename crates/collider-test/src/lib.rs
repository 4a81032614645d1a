// Iron Lotus: Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # collider-test
//!
//! Testing infrastructure for the threads collider.
//!
//! This crate provides:
//! - **Fixtures**: thread-safe and deliberately racy counters, lists and
//!   sets to collide on
//! - **Trials**: repeat a collision many times and aggregate what happened
//! - **Falsification tests**: Popperian tests for the collider's claims
//!
//! ## Iron Lotus Framework
//!
//! - **Built-in Quality** (品質の作り込み): Quality cannot be inspected in
//! - **Popperian Falsification**: Tests designed to refute claims
//! - **Genchi Genbutsu**: A race is shown by running it, many times
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use collider_core::Collider;
//! use collider_test::{Counter, Trial, TrialConfig, TrialRunner};
//!
//! let report = TrialRunner::new(TrialConfig::repeated(3)).run(|_| {
//!     let counter = Arc::new(Counter::new());
//!     let c = Arc::clone(&counter);
//!     let mut collider = Collider::threads(4, move || c.increment()).build()?;
//!     let run = collider.run()?;
//!     Ok(Trial::new(run).check(counter.value() == 4, "no lost increments"))
//! })?;
//! assert!(report.passed());
//! # Ok::<(), collider_test::TestError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod fixtures;
pub mod trials;

pub use error::{Result, TestError};
pub use fixtures::{Apple, Counter, RacyList, SharedList, ThreadUnsafeCounter, UniqueApples};
pub use trials::{Trial, TrialConfig, TrialReport, TrialRunner, Violation};
