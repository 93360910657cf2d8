//! Protocol error types

use thiserror::Error;

/// Errors that can occur while decoding or encoding frames
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Frame exceeds maximum size
    #[error("Frame too large: {size} bytes exceeds maximum of {max} bytes")]
    FrameTooLarge { size: usize, max: usize },

    /// Frame is not valid UTF-8 text
    #[error("Frame is not valid UTF-8")]
    InvalidUtf8,

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
