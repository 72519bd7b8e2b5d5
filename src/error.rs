//! Error types for the dino-dqn crate

use thiserror::Error;

/// Main error type for the dino-dqn crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("action on terminal simulator state")]
    TerminalState,

    #[error("{side} action but {expected} is at move")]
    WrongTurn {
        side: &'static str,
        expected: &'static str,
    },

    #[error("action index {action} is out of bounds")]
    InvalidAction { action: usize },

    #[error("replay memory holds {count} experiences, batch of {batch_size} requested")]
    InsufficientExperience { count: usize, batch_size: usize },

    #[error("replay memory slot {index} has never been written")]
    EmptySlot { index: usize },

    #[error("length mismatch in {context}: {left} vs {right}")]
    LengthMismatch {
        context: &'static str,
        left: usize,
        right: usize,
    },

    #[error("shape mismatch for {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        got: usize,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("no saved model found under '{location}', train a model first")]
    ModelNotFound { location: String },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to {operation}: {message}")]
    SerializationContext { operation: String, message: String },

    #[error("progress bar template error: {message}")]
    ProgressBarTemplate { message: String },
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}

impl Error {
    /// Build a configuration error from any displayable message.
    pub fn config(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            message: message.into(),
        }
    }
}
