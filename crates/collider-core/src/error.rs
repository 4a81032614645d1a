//! Error types for collider-core.
//!
//! Per Iron Lotus Framework: All errors are explicit, no panics allowed.
//!
//! Only failures of the collider itself are errors. Failures raised by
//! worker bodies, and the synthetic timeout diagnostic, are
//! [`crate::Failure`]s delivered through the exception sink instead.

/// Result type alias for collider operations.
pub type Result<T> = std::result::Result<T, ColliderError>;

/// Invalid collider configuration, detected before any worker starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// The action set has no actions.
    #[error("at least one action is required")]
    EmptyActionSet,

    /// An action repetition count below one.
    #[error("action has to be repeated at least once, but was {0} times")]
    InvalidRepetitionCount(i64),

    /// A setting could not be parsed or is out of range.
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

/// Errors surfaced synchronously to the caller of the collider.
#[derive(Debug, thiserror::Error)]
pub enum ColliderError {
    /// Configuration error, raised before any worker thread is spawned.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The collision machinery itself failed; no result can be guaranteed.
    #[error("orchestration failure: {0}")]
    Orchestration(String),

    /// Operation not valid in the collider's current state.
    #[error("invalid state: {0}")]
    State(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ColliderError {
    /// Creates an invalid-setting configuration error.
    #[must_use]
    pub fn setting(msg: impl Into<String>) -> Self {
        Self::Configuration(ConfigurationError::InvalidSetting(msg.into()))
    }

    /// Creates an orchestration failure.
    #[must_use]
    pub fn orchestration(msg: impl Into<String>) -> Self {
        Self::Orchestration(msg.into())
    }

    /// Creates an invalid state error.
    #[must_use]
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Returns true if the error was raised before any worker started.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns true if the run was aborted by the machinery itself.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Orchestration(_) | Self::Io(_))
    }
}
