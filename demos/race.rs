//! Race Exposure Example
//!
//! Collides a thread-safe counter and a load-then-store counter over a
//! series of trials, and prints how often each lost increments.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example race
//!
//! # More trials, debug logs from the collider
//! RUST_LOG=collider_core=debug cargo run --example race -- 200
//!
//! # JSON trial reports
//! cargo run --example race -- 50 --json
//! ```

use std::sync::Arc;

use collider::prelude::*;

const INCREMENTS_PER_WORKER: i64 = 10_000;

fn main() -> anyhow::Result<()> {
    // Initialize tracing for log output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let trials = args
        .iter()
        .skip(1)
        .find_map(|a| a.parse::<u32>().ok())
        .unwrap_or(20);
    let json = args.iter().any(|a| a == "--json");

    let workers = Processors::all();
    let expected = workers * INCREMENTS_PER_WORKER;
    println!("=== collider race example ===");
    println!("{workers} workers x {INCREMENTS_PER_WORKER} increments, {trials} trials\n");

    let safe = TrialRunner::new(TrialConfig::repeated(trials)).run(|_| {
        let counter = Arc::new(Counter::new());
        let c = Arc::clone(&counter);
        let mut collider = Collider::builder()
            .with_named_action(
                move || {
                    for _ in 0..INCREMENTS_PER_WORKER {
                        c.increment();
                    }
                },
                "atomic",
            )
            .times(workers)
            .build()?;
        let run = collider.run()?;
        Ok(Trial::new(run).check(counter.value() == expected, format!("got {}", counter.value())))
    })?;

    let racy = TrialRunner::new(TrialConfig::repeated(trials)).run(|_| {
        let counter = Arc::new(ThreadUnsafeCounter::new());
        let c = Arc::clone(&counter);
        let mut collider = Collider::builder()
            .with_named_action(
                move || {
                    for _ in 0..INCREMENTS_PER_WORKER {
                        c.increment();
                    }
                },
                "load-then-store",
            )
            .times(workers)
            .build()?;
        let run = collider.run()?;
        Ok(Trial::new(run).check(counter.value() == expected, format!("got {}", counter.value())))
    })?;

    for (name, report) in [("Counter", &safe), ("ThreadUnsafeCounter", &racy)] {
        println!(
            "{name:<20} lost updates in {:>3}/{} trials ({:.0}%), start spread p50 {}us",
            report.violations.len(),
            report.trials,
            report.violation_rate() * 100.0,
            report.start_spread_p50_us
        );
        if let Some(first) = report.violations.first() {
            println!("{:<20} first: trial {} expected {expected}, {}", "", first.trial, first.expectation);
        }
        if json {
            println!("{}", report.to_json()?);
        }
    }

    Ok(())
}
