//! Error types for user operations.

use thiserror::Error;

use pactbus_core::HandlerError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UserError {
    #[error("Invalid user: {0}")]
    Invalid(String),

    #[error("User already exists: {0}")]
    AlreadyExists(String),

    #[error("User not found: {0}")]
    NotFound(String),
}

pub type UserResult<T> = std::result::Result<T, UserError>;

impl From<UserError> for HandlerError {
    fn from(error: UserError) -> Self {
        match error {
            UserError::NotFound(id) => HandlerError::NotFound(id),
            other => HandlerError::Rejected(other.to_string()),
        }
    }
}
