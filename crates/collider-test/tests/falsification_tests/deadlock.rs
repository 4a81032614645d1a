//! Falsification Tests: Category D - Deadlock Diagnosis (F016-F018, F027)
//!
//! # Toyota Way: Genchi Genbutsu (現地現物)
//! When a run hangs, go and see which threads are stuck, and on what.

use std::sync::Arc;
use std::time::Duration;

use collider_core::{Collider, Failure, Outcome};
use collider_observe::{CycleDetection, DeadlockProbe};
use collider_test::{Trial, TrialConfig, TrialRunner};
use parking_lot::Mutex;

/// Builds a collider whose two actions lock `a` and `b` in opposite order,
/// holding the first lock long enough for the other worker to take its own.
fn lock_order_inversion(diagnostics: &Arc<Mutex<Vec<Failure>>>) -> Collider {
    let a = Arc::new(Mutex::new(0u32));
    let b = Arc::new(Mutex::new(0u32));
    let (a1, b1) = (Arc::clone(&a), Arc::clone(&b));
    let (a2, b2) = (a, b);
    let d = Arc::clone(diagnostics);

    Collider::builder()
        .with_named_action(
            move || {
                let mut first = a1.lock();
                std::thread::sleep(Duration::from_millis(50));
                *b1.lock() += 1;
                *first += 1;
            },
            "a-then-b",
        )
        .times(1)
        .with_named_action(
            move || {
                let mut first = b2.lock();
                std::thread::sleep(Duration::from_millis(50));
                *a2.lock() += 1;
                *first += 1;
            },
            "b-then-a",
        )
        .times(1)
        .with_await_termination_timeout(Duration::from_millis(300))
        .with_shutdown_grace(Duration::from_millis(10))
        .with_exceptions_consumer(move |f| d.lock().push(f))
        .build()
        .unwrap()
}

// =============================================================================
// F016-F018: Lock-Order Inversion
// =============================================================================

/// F016: A lock-order inversion ends in a timeout diagnostic naming the
/// blocked workers
///
/// # Falsification Attempt
/// Over 3 trials, a deadlocked run that completes, or whose diagnostic
/// does not name the workers, falsifies the claim.
#[test]
fn f016_deadlock_reported_with_worker_names() {
    for trial in 0..3 {
        let diagnostics = Arc::new(Mutex::new(Vec::new()));
        let mut collider = lock_order_inversion(&diagnostics);

        let run = collider.run().unwrap();
        assert_eq!(
            run.outcome,
            Outcome::TimedOut { unfinished: 2 },
            "F016 FALSIFIED on trial {trial}"
        );

        let close = collider.close();
        assert_eq!(close.abandoned.len(), 2);

        let diagnostics = diagnostics.lock();
        assert_eq!(diagnostics.len(), 1);
        let text = diagnostics[0].message();
        assert!(text.contains("There are unfinished threads."));
        assert!(text.contains("Check if there are any deadlocks and fix them."));
        assert!(
            text.contains("collider-pool-0 [a-then-b]")
                && text.contains("collider-pool-1 [b-then-a]"),
            "F016 FALSIFIED: workers not named in\n{text}"
        );
    }
}

/// F017: The report describes the blocked threads, and any cycle it claims
/// is made of the colliding workers
///
/// # Falsification Attempt
/// Inspect the structured report: two unfinished workers, and every named
/// member of a reported cycle is one of them.
#[test]
fn f017_report_structure() {
    let diagnostics = Arc::new(Mutex::new(Vec::new()));
    let mut collider = lock_order_inversion(&diagnostics);
    collider.run().unwrap();
    collider.close();

    let diagnostics = diagnostics.lock();
    let Some(Failure::UnfinishedThreads(unfinished)) = diagnostics.first() else {
        panic!("F017 FALSIFIED: no timeout diagnostic");
    };
    let report = &unfinished.report;
    assert_eq!(unfinished.timeout, Duration::from_millis(300));
    assert_eq!(report.unfinished.len(), 2);

    #[cfg(target_os = "linux")]
    assert!(
        report.has_blocked_thread(),
        "F017 FALSIFIED: deadlocked workers not seen as blocked\n{report}"
    );

    // collider-test's tests build with deadlock-detection on
    assert_eq!(report.cycle_detection, CycleDetection::ParkingLot);
    for cycle in &report.cycles {
        for name in cycle.members.iter().filter_map(|m| m.name.as_deref()) {
            assert!(
                name.ends_with("[a-then-b]") || name.ends_with("[b-then-a]"),
                "F017 FALSIFIED: foreign thread {name} in cycle"
            );
        }
    }
    assert!(report.to_json().unwrap().contains("a-then-b"));
}

/// F018: The same actions in a consistent lock order never time out
///
/// # Falsification Attempt
/// Both workers lock `a` then `b`; a timeout in any of 5 trials falsifies
/// the claim that the diagnostic only fires on real hangs.
#[test]
fn f018_consistent_lock_order_completes() {
    for trial in 0..5 {
        let a = Arc::new(Mutex::new(0u32));
        let b = Arc::new(Mutex::new(0u32));
        let (a1, b1) = (Arc::clone(&a), Arc::clone(&b));

        let mut collider = Collider::threads(2, move || {
            let mut first = a1.lock();
            std::thread::sleep(Duration::from_millis(5));
            *b1.lock() += 1;
            *first += 1;
        })
        .with_await_termination_timeout(Duration::from_secs(10))
        .build()
        .unwrap();

        let run = collider.run().unwrap();
        assert!(run.is_clean(), "F018 FALSIFIED on trial {trial}: {run:?}");
        assert_eq!(*a.lock(), 2);
        assert_eq!(*b.lock(), 2);
    }
}

// =============================================================================
// F027: Provoked Inversion
// =============================================================================

/// F027: Without any forced delay, every trial of a two-by-two inversion
/// either completes with all increments or times out with a diagnostic
///
/// # Falsification Attempt
/// Two actions, two workers each, locking `a` and `b` in opposite order
/// with nothing in between. Over 20 trials the deadlock depends only on the
/// simultaneous release. A trial that ends any other way (a completed run
/// with missing increments, or a timeout without a diagnostic) falsifies
/// the claim. The hit rate is reported, not asserted.
#[test]
fn f027_unforced_inversion_hit_rate() {
    const TRIALS: u32 = 20;

    let report = TrialRunner::new(TrialConfig::repeated(TRIALS))
        .run(|_| {
            let a = Arc::new(Mutex::new(0u32));
            let b = Arc::new(Mutex::new(0u32));
            let (a1, b1) = (Arc::clone(&a), Arc::clone(&b));
            let (a2, b2) = (Arc::clone(&a), Arc::clone(&b));
            let diagnostics = Arc::new(Mutex::new(0usize));
            let d = Arc::clone(&diagnostics);

            let mut collider = Collider::builder()
                .with_named_action(
                    move || {
                        let mut first = a1.lock();
                        *b1.lock() += 1;
                        *first += 1;
                    },
                    "a-then-b",
                )
                .times(2)
                .with_named_action(
                    move || {
                        let mut first = b2.lock();
                        *a2.lock() += 1;
                        *first += 1;
                    },
                    "b-then-a",
                )
                .times(2)
                .with_await_termination_timeout(Duration::from_millis(200))
                .with_shutdown_grace(Duration::from_millis(10))
                .with_exceptions_consumer(move |f: Failure| {
                    if f.is_unfinished_threads() {
                        *d.lock() += 1;
                    }
                })
                .build()?
                .with_probe(DeadlockProbe::listing_only());

            let run = collider.run()?;
            let deadlocked = !run.outcome.is_completed();
            let consistent = if deadlocked {
                *diagnostics.lock() == 1
            } else {
                *a.lock() == 4 && *b.lock() == 4 && run.is_clean()
            };
            assert!(consistent, "F027 FALSIFIED: inconsistent trial {run:?}");
            Ok(Trial::new(run).check(!deadlocked, "no lock-order deadlock"))
        })
        .unwrap();

    assert_eq!(report.trials, TRIALS);
    assert_eq!(report.completed + report.timed_out, TRIALS);
    assert_eq!(report.violations.len() as u32, report.timed_out);
    eprintln!(
        "unforced inversion deadlocked in {}/{} trials ({:.0}%)",
        report.timed_out,
        report.trials,
        report.violation_rate() * 100.0
    );
}
