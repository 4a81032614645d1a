//! Observability error types.

/// Result type alias for observe operations.
pub type Result<T> = std::result::Result<T, ObserveError>;

/// Observability errors.
#[derive(Debug, thiserror::Error)]
pub enum ObserveError {
    /// Thread inspection error.
    #[error("inspection error: {0}")]
    Inspect(String),

    /// The host offers no thread introspection.
    #[error("thread introspection unsupported on this platform")]
    Unsupported,

    /// Export error.
    #[error("export error: {0}")]
    Export(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ObserveError {
    /// Creates an inspection error.
    #[must_use]
    pub fn inspect(msg: impl Into<String>) -> Self {
        Self::Inspect(msg.into())
    }

    /// Creates an export error.
    #[must_use]
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }
}
