//! Deadlock Diagnosis Example
//!
//! Two actions take the same two locks in opposite order. The collider
//! starts them together, times out, and prints the report naming the
//! stuck workers (with their lock cycle when `deadlock-detection` is on).
//!
//! # Usage
//!
//! ```bash
//! cargo run --example deadlock
//!
//! # Timeout from the environment, JSON report
//! COLLIDER_AWAIT_TIMEOUT=250ms cargo run --example deadlock -- --json
//!
//! # Listing only, no cycle detection
//! cargo run --example deadlock --no-default-features
//! ```

use std::sync::Arc;
use std::time::Duration;

use collider::core::config::ENV_AWAIT_TIMEOUT;
use collider::prelude::*;
use parking_lot::Mutex;

fn main() -> anyhow::Result<()> {
    // Initialize tracing for log output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let json = std::env::args().any(|a| a == "--json");
    let mut settings = Settings::from_env()?;
    if std::env::var_os(ENV_AWAIT_TIMEOUT).is_none() {
        settings.await_termination_timeout = Duration::from_millis(500);
    }
    settings.shutdown_grace = Some(Duration::from_millis(10));

    let accounts = Arc::new(Mutex::new(100_i64));
    let audit_log = Arc::new(Mutex::new(Vec::<String>::new()));
    let (accounts_1, log_1) = (Arc::clone(&accounts), Arc::clone(&audit_log));
    let (accounts_2, log_2) = (accounts, audit_log);

    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);

    let mut collider = Collider::builder()
        .with_named_action(
            move || {
                let mut balance = accounts_1.lock();
                std::thread::sleep(Duration::from_millis(20));
                log_1.lock().push(format!("withdraw, balance {balance}"));
                *balance -= 10;
            },
            "withdraw",
        )
        .times(1)
        .with_named_action(
            move || {
                let mut log = log_2.lock();
                std::thread::sleep(Duration::from_millis(20));
                let balance = *accounts_2.lock();
                log.push(format!("audit, balance {balance}"));
            },
            "audit",
        )
        .times(1)
        .with_settings(settings)
        .with_exceptions_consumer(move |failure| sink.lock().push(failure))
        .build()?;

    println!("=== collider deadlock example ===\n");
    let report = collider.run()?;
    println!("outcome: {:?} after {:?}\n", report.outcome, report.elapsed);

    for failure in failures.lock().iter() {
        match failure {
            Failure::UnfinishedThreads(diagnostic) if json => {
                println!("{}", diagnostic.report.to_json()?);
            }
            other => println!("{other}"),
        }
    }

    let shutdown = collider.close();
    println!(
        "\njoined {} threads, abandoned {:?}",
        shutdown.joined, shutdown.abandoned
    );
    Ok(())
}
