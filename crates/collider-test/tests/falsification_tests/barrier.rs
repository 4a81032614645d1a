//! Falsification Tests: Category A - Simultaneous Release (F001-F005)
//!
//! # Toyota Way: Heijunka (平準化)
//! Every worker leaves the start line together, or the collision is not one.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use collider_core::{Collider, Processors};
use collider_test::{SharedList, Trial, TrialConfig, TrialRunner};

// =============================================================================
// F001-F003: Release Ordering
// =============================================================================

/// F001: No body starts before the barrier's release instant
///
/// # Falsification Attempt
/// Record the instant each body starts over 10 trials; if any is earlier
/// than the recorded release, the claim is falsified.
#[test]
fn f001_no_body_starts_before_release() {
    let report = TrialRunner::new(TrialConfig::repeated(10))
        .run(|_| {
            let starts = Arc::new(SharedList::new());
            let s = Arc::clone(&starts);
            let mut collider = Collider::threads(Processors::all().max(4), move || {
                s.push(Instant::now());
            })
            .build()?;

            let run = collider.run()?;
            let released_at = run.released_at.expect("barrier released");
            let early = starts.snapshot().iter().filter(|t| **t < released_at).count();
            Ok(Trial::new(run).check(early == 0, format!("{early} bodies started early")))
        })
        .unwrap();

    assert!(
        report.passed(),
        "F001 FALSIFIED: {:?}",
        report.violations
    );
}

/// F002: Body invocations equal the total worker count
///
/// # Falsification Attempt
/// Run two actions with different repetition counts; any other number of
/// invocations falsifies the claim.
#[test]
fn f002_invocations_equal_total_workers() {
    let left = Arc::new(AtomicUsize::new(0));
    let right = Arc::new(AtomicUsize::new(0));
    let (l, r) = (Arc::clone(&left), Arc::clone(&right));

    let mut collider = Collider::builder()
        .with_action(move || {
            l.fetch_add(1, Ordering::SeqCst);
        })
        .times(3)
        .with_action(move || {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .times(5)
        .build()
        .unwrap();

    let run = collider.run().unwrap();
    assert_eq!(run.total_workers, 8);
    assert_eq!(left.load(Ordering::SeqCst), 3, "F002 FALSIFIED: left action");
    assert_eq!(right.load(Ordering::SeqCst), 5, "F002 FALSIFIED: right action");
}

/// F003: Failing bodies do not change the invocation count
///
/// # Falsification Attempt
/// Every other body panics; invocations must still equal the worker count.
#[test]
fn f003_invocations_counted_even_when_bodies_fail() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let mut collider = Collider::threads(10, move || {
        if c.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            panic!("even call");
        }
    })
    .build()
    .unwrap();

    let run = collider.run().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 10, "F003 FALSIFIED");
    assert_eq!(run.failures, 5);
}

// =============================================================================
// F004-F005: Start Spread
// =============================================================================

/// F004: The start spread of a run is reported
///
/// # Falsification Attempt
/// A completed run without a start spread falsifies the claim.
#[test]
fn f004_start_spread_reported() {
    let mut collider = Collider::threads(4, || {}).build().unwrap();
    let run = collider.run().unwrap();
    assert!(run.start_spread.is_some(), "F004 FALSIFIED: no spread");
    assert!(run.released_at.is_some());
}

/// F005: More workers than cores are still all released
///
/// # Falsification Attempt
/// Run four workers per hardware thread; a timeout or a missing invocation
/// falsifies the claim that the spin wait yields to latecomers.
#[test]
fn f005_oversubscribed_run_completes() {
    let workers = Processors::all() * 4;
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let mut collider = Collider::threads(workers, move || {
        c.fetch_add(1, Ordering::SeqCst);
    })
    .build()
    .unwrap();

    let run = collider.run().unwrap();
    assert!(run.outcome.is_completed(), "F005 FALSIFIED: {:?}", run.outcome);
    assert_eq!(calls.load(Ordering::SeqCst) as i64, workers);
}
