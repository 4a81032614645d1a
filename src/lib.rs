//! Collider: start many threads at the same instant to provoke races and
//! deadlocks in tests.
//!
//! # Quick Start
//!
//! ```rust
//! use collider::prelude::*;
//! use std::sync::Arc;
//!
//! let counter = Arc::new(Counter::new());
//! let c = Arc::clone(&counter);
//! let mut collider = Collider::builder()
//!     .with_action(move || c.increment())
//!     .with_available_processors()
//!     .build()?;
//!
//! let report = collider.run()?;
//! assert!(report.is_clean());
//! assert_eq!(counter.value(), Processors::all());
//! # Ok::<(), ColliderError>(())
//! ```

pub use collider_core as core;
pub use collider_observe as observe;
pub use collider_test as testing;

/// Prelude module for common imports.
pub mod prelude {
    pub use collider_core::{
        Action, ActionSet, Collider, ColliderBuilder, ColliderConfig, ColliderError,
        ColliderState, Failure, Outcome, Processors, RunReport, Settings, WorkerError,
    };
    pub use collider_observe::{DeadlockProbe, DeadlockReport};
    pub use collider_test::{
        Apple, Counter, RacyList, SharedList, ThreadUnsafeCounter, Trial, TrialConfig,
        TrialReport, TrialRunner, UniqueApples,
    };
}
