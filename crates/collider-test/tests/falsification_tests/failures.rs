//! Falsification Tests: Category B - Failure Reporting (F006-F010)
//!
//! # Toyota Way: Jidoka (自働化)
//! A failing worker is reported, never lost and never fatal to the run.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use collider_core::{Collider, ColliderError, ConfigurationError, Failure, WorkerError};
use parking_lot::Mutex;

fn collecting() -> (Arc<Mutex<Vec<Failure>>>, impl FnMut(Failure) + Send + 'static) {
    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);
    (failures, move |f| sink.lock().push(f))
}

// =============================================================================
// F006-F008: Worker Failures
// =============================================================================

/// F006: Every panicking worker produces exactly one failure
///
/// # Falsification Attempt
/// Ten workers panic with "boom" over 10 runs; any count other than ten, or
/// another message, falsifies the claim.
#[test]
fn f006_every_panic_reported_once() {
    for trial in 0..10 {
        let (failures, observer) = collecting();
        let mut collider = Collider::threads(10, || panic!("boom"))
            .with_exceptions_consumer(observer)
            .build()
            .unwrap();

        let run = collider.run().unwrap();
        let failures = failures.lock();
        assert_eq!(failures.len(), 10, "F006 FALSIFIED on trial {trial}");
        assert_eq!(run.failures, 10);
        assert!(failures.iter().all(|f| f.message() == "boom"));
        assert!(failures.iter().all(|f| matches!(
            f,
            Failure::Worker {
                error: WorkerError::Panic(_),
                ..
            }
        )));
    }
}

/// F007: Returned errors are reported with their message and source
///
/// # Falsification Attempt
/// A fallible action returns an I/O error; the failure must carry it.
#[test]
fn f007_returned_error_reported() {
    let (failures, observer) = collecting();
    let mut collider = Collider::builder()
        .with_fallible_action(|| {
            Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "no access",
            ))
        })
        .named("reader")
        .times(3)
        .with_exceptions_consumer(observer)
        .build()
        .unwrap();

    collider.run().unwrap();
    let failures = failures.lock();
    assert_eq!(failures.len(), 3, "F007 FALSIFIED");
    for failure in failures.iter() {
        assert_eq!(failure.message(), "no access");
        assert_eq!(failure.action_name(), Some("reader"));
        assert!(std::error::Error::source(failure).is_some());
    }
}

/// F008: The observer is never called concurrently
///
/// # Falsification Attempt
/// A non-reentrant observer flags overlapping calls while 16 workers fail.
#[test]
fn f008_observer_not_called_concurrently() {
    let inside = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let calls = Arc::new(AtomicUsize::new(0));
    let (i, o, c) = (Arc::clone(&inside), Arc::clone(&overlaps), Arc::clone(&calls));

    let mut collider = Collider::threads(16, || panic!("boom"))
        .with_exceptions_consumer(move |_| {
            if i.fetch_add(1, Ordering::SeqCst) > 0 {
                o.fetch_add(1, Ordering::SeqCst);
            }
            std::thread::yield_now();
            c.fetch_add(1, Ordering::SeqCst);
            i.fetch_sub(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    collider.run().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 16);
    assert_eq!(overlaps.load(Ordering::SeqCst), 0, "F008 FALSIFIED");
}

// =============================================================================
// F009-F010: Configuration Errors
// =============================================================================

/// F009: A repetition count below one is rejected before any worker starts
///
/// # Falsification Attempt
/// Build with 0 and -1; a run, or a body invocation, falsifies the claim.
#[test]
fn f009_invalid_repetitions_rejected() {
    for times in [0, -1] {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let err = Collider::threads(times, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap_err();

        assert!(
            matches!(
                err,
                ColliderError::Configuration(ConfigurationError::InvalidRepetitionCount(t)) if t == times
            ),
            "F009 FALSIFIED: {err}"
        );
        assert!(err
            .to_string()
            .contains(&format!("action has to be repeated at least once, but was {times} times")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

/// F010: An empty action set is rejected
///
/// # Falsification Attempt
/// Building without actions must fail with a configuration error.
#[test]
fn f010_empty_action_set_rejected() {
    let err = Collider::builder().build().unwrap_err();
    assert!(
        matches!(
            err,
            ColliderError::Configuration(ConfigurationError::EmptyActionSet)
        ),
        "F010 FALSIFIED: {err}"
    );
}
