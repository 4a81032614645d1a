//! Test error types.

/// Result type alias for test operations.
pub type Result<T> = std::result::Result<T, TestError>;

/// Testing errors.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    /// A trial could not be carried out.
    #[error("trial error: {0}")]
    Trial(String),

    /// Assertion failed.
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// Report export failed.
    #[error("export error: {0}")]
    Export(String),

    /// Collider error.
    #[error("collider error: {0}")]
    Collider(#[from] collider_core::ColliderError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TestError {
    /// Creates a trial error.
    #[must_use]
    pub fn trial(msg: impl Into<String>) -> Self {
        Self::Trial(msg.into())
    }

    /// Creates an assertion error.
    #[must_use]
    pub fn assertion(msg: impl Into<String>) -> Self {
        Self::Assertion(msg.into())
    }
}
