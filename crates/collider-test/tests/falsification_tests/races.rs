//! Falsification Tests: Category E - Race Exposure (F019-F023, F025-F026)
//!
//! # Toyota Way: Poka-Yoke (ポカヨケ)
//! Thread-safe code survives every collision; racy code is caught by one.

use std::sync::Arc;

use collider_core::{Collider, Processors};
use collider_test::{
    Apple, Counter, RacyList, SharedList, ThreadUnsafeCounter, Trial, TrialConfig, TrialRunner,
    UniqueApples,
};

/// Appends per body in the racy scenarios. More appends per worker means
/// more overlapping read-modify-write windows per collision.
const APPENDS_PER_BODY: usize = 100;

fn multi_core() -> bool {
    if Processors::all() < 2 {
        eprintln!("skipping: race exposure needs at least two hardware threads");
        return false;
    }
    true
}

// =============================================================================
// F019-F021: Thread-Safe Structures Survive
// =============================================================================

/// F019: Ten workers appending to a synchronized list always leave ten
/// items and no failures
///
/// # Falsification Attempt
/// Any trial of 10 with a size other than 10, a foreign item, or a failure
/// falsifies the claim.
#[test]
fn f019_synchronized_append_never_loses_items() {
    let report = TrialRunner::new(TrialConfig::repeated(10))
        .run(|_| {
            let list = Arc::new(SharedList::new());
            let l = Arc::clone(&list);
            let mut collider = Collider::threads(10, move || l.push("x")).build()?;
            let run = collider.run()?;

            let items = list.snapshot();
            Ok(Trial::new(run)
                .check(items.len() == 10, format!("size {}", items.len()))
                .check(items.iter().all(|i| *i == "x"), "only \"x\""))
        })
        .unwrap();

    assert!(report.passed(), "F019 FALSIFIED: {:?}", report.violations);
    assert_eq!(report.completed, 10);
}

/// F020: Atomic increments and decrements colliding cancel out
///
/// # Falsification Attempt
/// Half the workers increment, half decrement; any non-zero result over
/// 10 trials falsifies the claim.
#[test]
fn f020_atomic_counter_balances() {
    let report = TrialRunner::new(TrialConfig::repeated(10))
        .run(|_| {
            let counter = Arc::new(Counter::new());
            let (up, down) = (Arc::clone(&counter), Arc::clone(&counter));
            let mut collider = Collider::builder()
                .with_action(move || up.increment())
                .times(Processors::half())
                .with_action(move || down.decrement())
                .times(Processors::half())
                .build()?;
            let run = collider.run()?;
            Ok(Trial::new(run).check(counter.value() == 0, format!("value {}", counter.value())))
        })
        .unwrap();

    assert!(report.passed(), "F020 FALSIFIED: {:?}", report.violations);
}

/// F021: Synchronized unique insertion keeps one apple
///
/// # Falsification Attempt
/// Every worker adds the same apple; more than one apple in any of 10
/// trials falsifies the claim.
#[test]
fn f021_unique_apples_stay_unique() {
    let report = TrialRunner::new(TrialConfig::repeated(10))
        .run(|_| {
            let apples = Arc::new(UniqueApples::new());
            let a = Arc::clone(&apples);
            let mut collider = Collider::threads(Processors::all().max(2), move || {
                a.add(Apple::new("golden"));
            })
            .build()?;
            let run = collider.run()?;
            Ok(Trial::new(run).check(apples.len() == 1, format!("{} apples", apples.len())))
        })
        .unwrap();

    assert!(report.passed(), "F021 FALSIFIED: {:?}", report.violations);
}

// =============================================================================
// F022-F023: Racy Structures Are Caught
// =============================================================================

/// F022: A racy append loses items in at least one collision
///
/// # Falsification Attempt
/// One worker per hardware thread appends to a copy-and-write-back list;
/// if 100 trials never lose an item, the collider failed to expose the race.
#[test]
fn f022_racy_append_caught() {
    if !multi_core() {
        return;
    }
    let workers = Processors::all();
    let expected = workers as usize * APPENDS_PER_BODY;

    let report = TrialRunner::new(TrialConfig::until_violation(100))
        .run(|_| {
            let list = Arc::new(RacyList::new());
            let l = Arc::clone(&list);
            let mut collider = Collider::threads(workers, move || {
                for i in 0..APPENDS_PER_BODY {
                    l.push(i);
                }
            })
            .build()?;
            let run = collider.run()?;
            Ok(Trial::new(run).check(list.len() == expected, "no lost appends"))
        })
        .unwrap();

    assert!(
        report.any_violation(),
        "F022 FALSIFIED: race not exposed in {} trials",
        report.trials
    );
}

/// F023: A load-then-store counter loses increments in at least one
/// collision
///
/// # Falsification Attempt
/// If 100 trials never lose an increment, the race went unnoticed.
#[test]
fn f023_thread_unsafe_counter_caught() {
    if !multi_core() {
        return;
    }
    let workers = Processors::all();
    let per_body = 10_000;

    let report = TrialRunner::new(TrialConfig::until_violation(100))
        .run(|_| {
            let counter = Arc::new(ThreadUnsafeCounter::new());
            let c = Arc::clone(&counter);
            let mut collider = Collider::threads(workers, move || {
                for _ in 0..per_body {
                    c.increment();
                }
            })
            .build()?;
            let run = collider.run()?;
            Ok(Trial::new(run).check(counter.value() == workers * per_body, "no lost increments"))
        })
        .unwrap();

    assert!(
        report.any_violation(),
        "F023 FALSIFIED: race not exposed in {} trials",
        report.trials
    );
}

// =============================================================================
// F025-F026: One Racy Operation Per Worker
// =============================================================================

/// F025: A single racy append per worker loses an item in at least one
/// collision
///
/// # Falsification Attempt
/// One action, one worker per hardware thread, one append each. The only
/// overlap comes from the simultaneous release; if 1000 trials never lose
/// an item, the release is not simultaneous enough to expose the race.
#[test]
fn f025_single_racy_append_caught() {
    if !multi_core() {
        return;
    }
    let workers = Processors::all();

    let report = TrialRunner::new(TrialConfig::until_violation(1000))
        .run(|_| {
            let list = Arc::new(RacyList::new());
            let l = Arc::clone(&list);
            let mut collider = Collider::threads(workers, move || l.push("x")).build()?;
            let run = collider.run()?;
            Ok(Trial::new(run).check(
                list.len() == workers as usize,
                format!("{} of {workers} appends kept", list.len()),
            ))
        })
        .unwrap();

    assert!(
        report.any_violation(),
        "F025 FALSIFIED: race not exposed in {} trials",
        report.trials
    );
    assert_eq!(report.failures, 0);
}

/// F026: A check-then-insert across two lock scopes adds a duplicate apple
/// in at least one collision
///
/// # Falsification Attempt
/// Every worker adds the same apple once with `add_racy`; if 1000 trials
/// always end with one apple, the collider failed to expose the race.
#[test]
fn f026_racy_check_then_insert_caught() {
    if !multi_core() {
        return;
    }

    let report = TrialRunner::new(TrialConfig::until_violation(1000))
        .run(|_| {
            let apples = Arc::new(UniqueApples::new());
            let a = Arc::clone(&apples);
            let mut collider = Collider::threads(Processors::all(), move || {
                a.add_racy(Apple::new("golden"));
            })
            .build()?;
            let run = collider.run()?;
            Ok(Trial::new(run).check(apples.len() == 1, format!("{} apples", apples.len())))
        })
        .unwrap();

    assert!(
        report.any_violation(),
        "F026 FALSIFIED: duplicate never added in {} trials",
        report.trials
    );
    let first = &report.violations[0];
    assert!(first.expectation.ends_with("apples"));
}
