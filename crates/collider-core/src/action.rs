//! Actions: the units of work a collision runs.
//!
//! # Toyota Way: Poka-Yoke (ポカヨケ)
//! A repetition count below one is rejected when the action is built,
//! never clamped.

use std::fmt;
use std::sync::Arc;

use crate::error::{ConfigurationError, Result};

/// Boxed error returned by fallible action bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Type-erased action body, shared by every worker running the action.
pub(crate) type ActionBody = Arc<dyn Fn() -> std::result::Result<(), BoxError> + Send + Sync>;

/// A validated unit of work: a body, an optional diagnostic name and a
/// repetition count (one worker per repetition).
#[derive(Clone)]
pub struct Action {
    body: ActionBody,
    name: Option<String>,
    repetitions: usize,
}

impl Action {
    /// Creates an action from an infallible body. A panic in the body is
    /// reported as a worker failure.
    ///
    /// # Errors
    /// Returns a configuration error if `times < 1`.
    pub fn new<F>(body: F, times: i64) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::from_body(infallible_body(body), times)
    }

    /// Creates an action from a fallible body. Both `Err` returns and panics
    /// are reported as worker failures.
    ///
    /// # Errors
    /// Returns a configuration error if `times < 1`.
    pub fn fallible<F, E>(body: F, times: i64) -> Result<Self>
    where
        F: Fn() -> std::result::Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::from_body(fallible_body(body), times)
    }

    pub(crate) fn from_body(body: ActionBody, times: i64) -> Result<Self> {
        Ok(Self {
            body,
            name: None,
            repetitions: validate_repetitions(times)?,
        })
    }

    /// Attaches a diagnostic name, shown in worker thread names and in the
    /// timeout report.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the diagnostic name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns how many workers run this action.
    #[must_use]
    pub const fn repetitions(&self) -> usize {
        self.repetitions
    }

    /// Runs the body once on the calling thread.
    pub(crate) fn invoke(&self) -> std::result::Result<(), BoxError> {
        (self.body)()
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("repetitions", &self.repetitions)
            .finish_non_exhaustive()
    }
}

pub(crate) fn infallible_body<F>(body: F) -> ActionBody
where
    F: Fn() + Send + Sync + 'static,
{
    Arc::new(move || {
        body();
        Ok(())
    })
}

pub(crate) fn fallible_body<F, E>(body: F) -> ActionBody
where
    F: Fn() -> std::result::Result<(), E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    Arc::new(move || body().map_err(Into::into))
}

fn validate_repetitions(times: i64) -> std::result::Result<usize, ConfigurationError> {
    if times < 1 {
        return Err(ConfigurationError::InvalidRepetitionCount(times));
    }
    usize::try_from(times).map_err(|_| ConfigurationError::InvalidRepetitionCount(times))
}

/// Ordered collection of actions.
#[derive(Debug, Clone, Default)]
pub struct ActionSet {
    actions: Vec<Action>,
}

impl ActionSet {
    /// Creates an empty action set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// Appends an action.
    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Appends an action, builder style.
    #[must_use]
    pub fn with(mut self, action: Action) -> Self {
        self.push(action);
        self
    }

    /// Returns the number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if there are no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Total worker count: the sum of every action's repetitions.
    #[must_use]
    pub fn total_workers(&self) -> usize {
        self.actions.iter().map(Action::repetitions).sum()
    }

    /// Iterates over the actions in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    /// Checks the set can be run: at least one action, at least one worker.
    ///
    /// # Errors
    /// Returns a configuration error otherwise.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(ConfigurationError::EmptyActionSet.into());
        }
        if let Some(action) = self.actions.iter().find(|a| a.repetitions == 0) {
            return Err(ConfigurationError::InvalidRepetitionCount(action.repetitions as i64).into());
        }
        Ok(())
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ActionSet {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
