//! Fluent construction of a [`Collider`].
//!
//! Every action is declared in two steps, the body and then its repetition
//! count, so an action without a count cannot be built:
//!
//! ```rust
//! use collider_core::Collider;
//! use std::time::Duration;
//!
//! let mut collider = Collider::builder()
//!     .with_action(|| {}).times(4)
//!     .with_named_action(|| {}, "reader").times(2)
//!     .with_await_termination_timeout(Duration::from_secs(5))
//!     .build()?;
//! assert_eq!(collider.total_workers(), 6);
//! collider.run()?;
//! # Ok::<(), collider_core::ColliderError>(())
//! ```
//!
//! Configuration errors are kept until [`ColliderBuilder::build`], which
//! returns the first one.

use std::time::Duration;

use crate::action::{self, Action, ActionBody, ActionSet, BoxError};
use crate::collider::Collider;
use crate::config::{ColliderConfig, Settings};
use crate::error::{ColliderError, Result};
use crate::processors::Processors;
use crate::sink::Failure;

/// Builder for [`Collider`].
#[derive(Default)]
pub struct ColliderBuilder {
    config: Option<ColliderConfig>,
    error: Option<ColliderError>,
}

/// An action waiting for its repetition count.
#[must_use = "an action is only added once its repetition count is set"]
pub struct ActionStep {
    builder: ColliderBuilder,
    body: ActionBody,
    name: Option<String>,
}

impl ColliderBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn config(&mut self) -> &mut ColliderConfig {
        self.config
            .get_or_insert_with(|| ColliderConfig::new(ActionSet::new()))
    }

    fn fail(&mut self, error: ColliderError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Declares an action with an infallible body.
    pub fn with_action<F>(self, body: F) -> ActionStep
    where
        F: Fn() + Send + Sync + 'static,
    {
        ActionStep {
            builder: self,
            body: action::infallible_body(body),
            name: None,
        }
    }

    /// Declares a named action. The name shows up in worker thread names and
    /// in the timeout report.
    pub fn with_named_action<F>(self, body: F, name: impl Into<String>) -> ActionStep
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.with_action(body).named(name)
    }

    /// Declares an action whose body may return an error.
    pub fn with_fallible_action<F, E>(self, body: F) -> ActionStep
    where
        F: Fn() -> std::result::Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        ActionStep {
            builder: self,
            body: action::fallible_body(body),
            name: None,
        }
    }

    /// Adds an already validated action.
    #[must_use]
    pub fn add_action(mut self, action: Action) -> Self {
        self.config().actions.push(action);
        self
    }

    /// Sets how long `run()` waits for the workers.
    #[must_use]
    pub fn with_await_termination_timeout(mut self, timeout: Duration) -> Self {
        self.config().settings.await_termination_timeout = timeout;
        self
    }

    /// Sets how long `close()` waits for pool threads.
    #[must_use]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.config().settings.shutdown_grace = Some(grace);
        self
    }

    /// Replaces every timing setting.
    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.config().settings = settings;
        self
    }

    /// Sets the observer receiving every failure of the run.
    ///
    /// The observer is only ever called from the thread that calls
    /// `run()` or `close()`, one failure at a time.
    #[must_use]
    pub fn with_exceptions_consumer<F>(mut self, observer: F) -> Self
    where
        F: FnMut(Failure) + Send + 'static,
    {
        self.config().on_exception = Some(Box::new(observer));
        self
    }

    /// Builds the collider.
    ///
    /// # Errors
    /// Returns the first configuration error: an invalid repetition count,
    /// an empty action set or an invalid setting.
    pub fn build(mut self) -> Result<Collider> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        let config = self
            .config
            .take()
            .unwrap_or_else(|| ColliderConfig::new(ActionSet::new()));
        Collider::new(config)
    }
}

impl ActionStep {
    /// Names the action.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets how many workers run the action. A count below one is recorded
    /// as a configuration error and reported by `build()`.
    #[must_use]
    pub fn times(self, times: i64) -> ColliderBuilder {
        let Self {
            mut builder,
            body,
            name,
        } = self;
        match Action::from_body(body, times) {
            Ok(action) => {
                let action = match name {
                    Some(name) => action.named(name),
                    None => action,
                };
                builder.config().actions.push(action);
            }
            Err(error) => builder.fail(error),
        }
        builder
    }

    /// Runs the action once per available hardware thread.
    #[must_use]
    pub fn with_available_processors(self) -> ColliderBuilder {
        self.times(Processors::all())
    }
}
