//! The collider: launches every worker, releases them together, waits for
//! them and reports what went wrong.
//!
//! # Toyota Way: Jidoka (自働化)
//! A run that does not finish in time stops waiting and explains why,
//! naming the workers that are stuck.

use std::sync::Arc;
use std::time::Instant;

use collider_observe::DeadlockProbe;

use crate::action::ActionSet;
use crate::barrier::ArrivalBarrier;
use crate::builder::ColliderBuilder;
use crate::completion::{Completion, CompletionTracker};
use crate::config::{ColliderConfig, Settings};
use crate::error::{ColliderError, Result};
use crate::pool::{ShutdownOutcome, WorkerPool};
use crate::sink::{ExceptionSink, Failure, FailureObserver, UnfinishedThreads};
use crate::types::{ColliderState, Outcome, RunId, RunReport, WorkerId};
use crate::worker::{WorkerRegistry, WorkerTask, thread_name};

/// Runs a set of actions so that all their workers start at the same
/// instant.
///
/// A collider runs once. Call [`Collider::close`] (or drop it) to release
/// the worker threads.
pub struct Collider {
    run_id: RunId,
    actions: ActionSet,
    settings: Settings,
    observer: FailureObserver,
    state: ColliderState,
    sink: Arc<ExceptionSink>,
    pool: Option<WorkerPool>,
    probe: DeadlockProbe,
}

impl Collider {
    /// Creates a collider from a validated configuration.
    ///
    /// # Errors
    /// Returns a configuration error if the configuration is invalid.
    pub fn new(config: ColliderConfig) -> Result<Self> {
        config.validate()?;
        let ColliderConfig {
            actions,
            settings,
            on_exception,
        } = config;

        Ok(Self {
            run_id: RunId::new(),
            actions,
            settings,
            observer: on_exception.unwrap_or_else(|| Box::new(|_| {})),
            state: ColliderState::Idle,
            sink: Arc::new(ExceptionSink::new()),
            pool: None,
            probe: DeadlockProbe::new(),
        })
    }

    /// Creates a builder.
    #[must_use]
    pub fn builder() -> ColliderBuilder {
        ColliderBuilder::new()
    }

    /// Builder pre-loaded with a single action run by `threads` workers.
    #[must_use]
    pub fn threads<F>(threads: i64, body: F) -> ColliderBuilder
    where
        F: Fn() + Send + Sync + 'static,
    {
        ColliderBuilder::new().with_action(body).times(threads)
    }

    /// Replaces the deadlock probe used after a timeout.
    #[must_use]
    pub fn with_probe(mut self, probe: DeadlockProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Returns the run identifier.
    #[must_use]
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ColliderState {
        self.state
    }

    /// Returns the number of workers a run launches.
    #[must_use]
    pub fn total_workers(&self) -> usize {
        self.actions.total_workers()
    }

    /// Returns the timing settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs the collision.
    ///
    /// Launches one thread per repetition, releases them all once the last
    /// one is ready, and waits up to the completion timeout. Failures of the
    /// bodies, and the diagnostic of a timeout, go to the observer before
    /// this returns; they are not errors.
    ///
    /// # Errors
    /// Returns a state error if the collider already ran or was closed, a
    /// configuration error if the actions are invalid, or an orchestration
    /// error if a worker thread could not be launched.
    pub fn run(&mut self) -> Result<RunReport> {
        if self.state != ColliderState::Idle {
            return Err(ColliderError::state(format!(
                "a collider runs once, current state is {:?}",
                self.state
            )));
        }
        self.actions.validate()?;

        let total = self.actions.total_workers();
        let span = tracing::info_span!("collide", run_id = %self.run_id);
        let _entered = span.enter();
        tracing::info!(
            total_workers = total,
            actions = self.actions.len(),
            "collision starting"
        );

        self.state = ColliderState::Launching;
        let started = Instant::now();

        let mut plan = Vec::with_capacity(total);
        for (action_index, action) in self.actions.iter().enumerate() {
            for _ in 0..action.repetitions() {
                let id = WorkerId {
                    index: plan.len(),
                    action_index,
                };
                plan.push((id, thread_name(id.index, action.name()), action.clone()));
            }
        }

        let barrier = Arc::new(ArrivalBarrier::new(total));
        let tracker = Arc::new(CompletionTracker::new(total));
        let registry = Arc::new(WorkerRegistry::new(
            plan.iter().map(|(_, name, _)| name.clone()).collect(),
        ));
        let mut pool = WorkerPool::new(total);

        for (id, name, action) in plan {
            let task = WorkerTask {
                id,
                action,
                barrier: Arc::clone(&barrier),
                tracker: Arc::clone(&tracker),
                sink: Arc::clone(&self.sink),
                registry: Arc::clone(&registry),
            };
            if let Err(err) = pool.submit(name, move || task.run()) {
                return Err(self.abort_launch(pool, &barrier, id, total, &err));
            }
        }

        self.state = ColliderState::AwaitingCompletion;
        let timeout = self.settings.await_termination_timeout;
        let outcome = match tracker.await_all(timeout) {
            Completion::Completed => {
                self.state = ColliderState::Completed;
                Outcome::Completed
            }
            Completion::TimedOut { remaining } => {
                self.state = ColliderState::TimedOut;
                tracing::warn!(
                    unfinished = remaining,
                    timeout = %humantime::format_duration(timeout),
                    "workers did not finish in time"
                );
                let report = self.probe.probe(&registry.watched());
                self.sink
                    .record(Failure::UnfinishedThreads(UnfinishedThreads { timeout, report }));
                Outcome::TimedOut {
                    unfinished: remaining,
                }
            }
        };
        let elapsed = started.elapsed();
        self.pool = Some(pool);

        let failures = self.sink.drain(&mut *self.observer);
        let report = RunReport {
            run_id: self.run_id,
            outcome,
            total_workers: total,
            failures,
            released_at: barrier.released_at(),
            start_spread: registry.start_spread(),
            elapsed,
        };

        tracing::info!(
            completed = outcome.is_completed(),
            failures,
            elapsed = ?elapsed,
            start_spread = ?report.start_spread,
            "collision finished"
        );
        Ok(report)
    }

    /// Alias of [`Collider::run`].
    ///
    /// # Errors
    /// See [`Collider::run`].
    pub fn collide(&mut self) -> Result<RunReport> {
        self.run()
    }

    fn abort_launch(
        &mut self,
        mut pool: WorkerPool,
        barrier: &ArrivalBarrier,
        failed: WorkerId,
        total: usize,
        err: &ColliderError,
    ) -> ColliderError {
        tracing::error!(worker = %failed, error = %err, "failed to launch worker, aborting run");
        barrier.abort();
        let outcome = pool.shutdown(self.settings.shutdown_grace());
        self.sink.drain(&mut *self.observer);
        self.state = ColliderState::Closed;
        ColliderError::orchestration(format!(
            "launched {} of {total} workers: {err}",
            outcome.joined + outcome.abandoned.len()
        ))
    }

    /// Releases the worker threads.
    ///
    /// Joins every thread that finishes within the shutdown grace period and
    /// abandons the rest, then delivers failures recorded after `run()`
    /// returned. Calling it again does nothing.
    pub fn close(&mut self) -> ShutdownOutcome {
        if self.state == ColliderState::Closed {
            return ShutdownOutcome::default();
        }

        let outcome = self
            .pool
            .take()
            .map(|mut pool| pool.shutdown(self.settings.shutdown_grace()))
            .unwrap_or_default();
        let late = self.sink.drain(&mut *self.observer);
        self.state = ColliderState::Closed;

        tracing::info!(
            run_id = %self.run_id,
            joined = outcome.joined,
            abandoned = outcome.abandoned.len(),
            late_failures = late,
            "collider closed"
        );
        outcome
    }
}

impl Drop for Collider {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Collider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collider")
            .field("run_id", &self.run_id)
            .field("state", &self.state)
            .field("actions", &self.actions)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
