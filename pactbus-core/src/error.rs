//! Error types for the event bus.

use thiserror::Error;

/// Boxed error used to carry transport failures from backing implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Bus-level errors returned by `publish`, `listen` and `close`.
///
/// Handler failures never surface here; they go to [`HandlerError`] and the
/// handler's own error callback.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    #[error("Failed to declare topology for listener {listener}: {source}")]
    Topology {
        listener: String,
        #[source]
        source: BoxError,
    },

    #[error("No more messages available for listener {listener}")]
    NoMoreMessages { listener: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown event bus mode: {0}")]
    UnknownMode(String),
}

/// Result type alias for bus operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while a handler processes an event.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Could not decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unexpected payload for {expected}")]
    UnexpectedPayload { expected: String },

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl HandlerError {
    /// Whether retrying the same payload can never succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            HandlerError::Decode(_) | HandlerError::UnexpectedPayload { .. }
        )
    }
}
