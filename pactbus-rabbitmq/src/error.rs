//! Error types for the RabbitMQ event bus.

/// Error type for broker operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Event bus is closed")]
    Closed,
}

/// Result type alias for broker operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for pactbus_core::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Serialization(e) => pactbus_core::Error::Serialization(e),
            other => pactbus_core::Error::Transport(Box::new(other)),
        }
    }
}
