//! Error types for the binlift decoder.
//!
//! Recoverable conditions (a target that lands in non-code, a translation
//! that fails mid-run) are handled inside the decoder and never surface
//! here. Everything in [`LiftError`] aborts the decode run.

use thiserror::Error;

/// Main error type for lifting operations.
#[derive(Debug, Error)]
pub enum LiftError {
    /// The instruction translator could not be created or configured
    #[error("Translator error ({arch}): {message}")]
    Translator { arch: String, message: String },

    /// The graph would become inconsistent if decoding continued
    #[error("Structural invariant violated at {address:#x}: {message}")]
    Structural { address: u64, message: String },

    /// A placeholder survived the end of the run
    #[error("{count} control-transfer placeholder(s) left unresolved")]
    UnresolvedEdges { count: usize },

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Binary format parsing errors
    #[error("Invalid binary format: {0}")]
    InvalidFormat(String),

    /// Resource limit exceeded
    #[error("Resource limit exceeded: {resource} ({used}/{limit})")]
    ResourceExhausted {
        resource: String,
        used: usize,
        limit: usize,
    },

    /// Decode run did not finish in time
    #[error("Decode timeout after {millis}ms")]
    Timeout { millis: u64 },

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LiftError {
    pub(crate) fn structural(address: u64, message: impl Into<String>) -> Self {
        LiftError::Structural {
            address,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for LiftError {
    fn from(e: serde_json::Error) -> Self {
        LiftError::Serialization(e.to_string())
    }
}

/// Result type alias for lifting operations
pub type Result<T> = std::result::Result<T, LiftError>;
