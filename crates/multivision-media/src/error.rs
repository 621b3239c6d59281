//! Error types for multivision-media.

use thiserror::Error;

/// Result type for multivision-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for multivision-media operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Blob too small for the declared header or payload lengths.
    #[error("Buffer underflow: need {need} bytes, have {have}")]
    BufferUnderflow { need: usize, have: usize },

    /// Layout and payload disagree (camera count, audio presence, sizes).
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// Segment rate is not a positive finite number.
    #[error("Invalid segment rate: {0}")]
    InvalidRate(f64),

    /// Unknown header byte order name.
    #[error("Unknown byte order: {0}")]
    UnknownByteOrder(String),
}

impl Error {
    /// Create an invalid layout error.
    pub fn invalid_layout(msg: impl Into<String>) -> Self {
        Self::InvalidLayout(msg.into())
    }
}
