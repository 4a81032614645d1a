//! Repeated collisions.
//!
//! # Toyota Way: Genchi Genbutsu (現地現物)
//! A race shows up in some runs and not in others. One clean run proves
//! little, so a claim is checked over many trials and the numbers are kept.

use std::time::{Duration, Instant};

use collider_core::{Outcome, RunReport};
use serde::Serialize;

use crate::error::{Result, TestError};

/// Trial runner configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialConfig {
    /// Number of trials.
    pub trials: u32,
    /// Stop after the first trial with a violation.
    pub stop_on_violation: bool,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            trials: 10,
            stop_on_violation: false,
        }
    }
}

impl TrialConfig {
    /// Runs `trials` trials.
    #[must_use]
    pub fn repeated(trials: u32) -> Self {
        Self {
            trials,
            ..Default::default()
        }
    }

    /// Runs up to `trials` trials, stopping at the first violation. Used to
    /// show that a race can happen.
    #[must_use]
    pub const fn until_violation(trials: u32) -> Self {
        Self {
            trials,
            stop_on_violation: true,
        }
    }
}

/// Result of one trial: the collider's report plus the test's own verdict
/// on the shared state.
#[derive(Debug, Clone)]
pub struct Trial {
    /// Collider report.
    pub report: RunReport,
    /// Description of the violated expectation, if any.
    pub violation: Option<String>,
}

impl Trial {
    /// Creates a trial with no violation.
    #[must_use]
    pub const fn new(report: RunReport) -> Self {
        Self {
            report,
            violation: None,
        }
    }

    /// Records a violation unless `holds` is true. Only the first violation
    /// is kept.
    #[must_use]
    pub fn check(mut self, holds: bool, expectation: impl Into<String>) -> Self {
        if !holds && self.violation.is_none() {
            self.violation = Some(expectation.into());
        }
        self
    }
}

/// Runs a collision scenario many times.
#[derive(Debug, Clone, Default)]
pub struct TrialRunner {
    config: TrialConfig,
}

impl TrialRunner {
    /// Creates a runner.
    #[must_use]
    pub const fn new(config: TrialConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &TrialConfig {
        &self.config
    }

    /// Runs `scenario` once per trial, passing the trial index.
    ///
    /// # Errors
    /// Returns an error if zero trials are configured or if a scenario
    /// fails to run its collider.
    pub fn run<F>(&self, mut scenario: F) -> Result<TrialReport>
    where
        F: FnMut(u32) -> Result<Trial>,
    {
        if self.config.trials == 0 {
            return Err(TestError::trial("at least one trial is required"));
        }
        tracing::info!(trials = self.config.trials, "starting trials");

        let started = Instant::now();
        let mut tally = Tally::default();
        for index in 0..self.config.trials {
            let trial = scenario(index)?;
            let violated = trial.violation.is_some();
            tally.record(index, trial);
            if violated && self.config.stop_on_violation {
                tracing::debug!(trial = index, "violation found, stopping");
                break;
            }
        }

        let report = tally.finish(started.elapsed());
        tracing::info!(
            trials = report.trials,
            completed = report.completed,
            timed_out = report.timed_out,
            failures = report.failures,
            violations = report.violations.len(),
            p50_us = report.elapsed_p50_us,
            p99_us = report.elapsed_p99_us,
            "trials completed"
        );
        Ok(report)
    }
}

#[derive(Default)]
struct Tally {
    trials: u32,
    completed: u32,
    timed_out: u32,
    failures: u64,
    violations: Vec<Violation>,
    elapsed_us: Vec<u64>,
    spread_us: Vec<u64>,
}

impl Tally {
    fn record(&mut self, index: u32, trial: Trial) {
        self.trials += 1;
        match trial.report.outcome {
            Outcome::Completed => self.completed += 1,
            Outcome::TimedOut { .. } => self.timed_out += 1,
        }
        self.failures += trial.report.failures as u64;
        self.elapsed_us.push(micros(trial.report.elapsed));
        if let Some(spread) = trial.report.start_spread {
            self.spread_us.push(micros(spread));
        }
        if let Some(expectation) = trial.violation {
            self.violations.push(Violation {
                trial: index,
                expectation,
            });
        }
    }

    fn finish(mut self, total: Duration) -> TrialReport {
        self.elapsed_us.sort_unstable();
        self.spread_us.sort_unstable();
        TrialReport {
            trials: self.trials,
            completed: self.completed,
            timed_out: self.timed_out,
            failures: self.failures,
            violations: self.violations,
            elapsed_p50_us: percentile(&self.elapsed_us, 50),
            elapsed_p95_us: percentile(&self.elapsed_us, 95),
            elapsed_p99_us: percentile(&self.elapsed_us, 99),
            start_spread_p50_us: percentile(&self.spread_us, 50),
            start_spread_p99_us: percentile(&self.spread_us, 99),
            total_elapsed_ms: u64::try_from(total.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Computes percentile from sorted slice.
fn percentile(sorted: &[u64], p: usize) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = (sorted.len() * p / 100).min(sorted.len() - 1);
    sorted[idx]
}

/// A trial whose expectation did not hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Trial index.
    pub trial: u32,
    /// What was expected.
    pub expectation: String,
}

/// Aggregate of a series of trials.
#[derive(Debug, Clone, Serialize)]
pub struct TrialReport {
    /// Trials run.
    pub trials: u32,
    /// Trials whose workers all finished in time.
    pub completed: u32,
    /// Trials that hit the completion timeout.
    pub timed_out: u32,
    /// Failures delivered to observers, summed over trials.
    pub failures: u64,
    /// Violated expectations.
    pub violations: Vec<Violation>,
    /// P50 run duration in microseconds.
    pub elapsed_p50_us: u64,
    /// P95 run duration in microseconds.
    pub elapsed_p95_us: u64,
    /// P99 run duration in microseconds.
    pub elapsed_p99_us: u64,
    /// P50 spread between first and last body start, in microseconds.
    pub start_spread_p50_us: u64,
    /// P99 spread between first and last body start, in microseconds.
    pub start_spread_p99_us: u64,
    /// Wall time of the whole series in milliseconds.
    pub total_elapsed_ms: u64,
}

impl TrialReport {
    /// Returns true if every trial completed with no failure and no
    /// violation.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.timed_out == 0 && self.failures == 0 && self.violations.is_empty()
    }

    /// Returns true if at least one trial violated its expectation.
    #[must_use]
    pub fn any_violation(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Returns the share of trials with a violation (0.0 to 1.0).
    #[must_use]
    pub fn violation_rate(&self) -> f64 {
        if self.trials > 0 {
            self.violations.len() as f64 / f64::from(self.trials)
        } else {
            0.0
        }
    }

    /// Serializes the report to pretty JSON.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| TestError::Export(e.to_string()))
    }
}
