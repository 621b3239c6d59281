//! Common error type used throughout multivision.

/// Common error type for multivision.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The player task is no longer running.
    #[error("Player closed")]
    Closed,
}

impl Error {
    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
