//! User model shared by producers and the projection.

use serde::{Deserialize, Serialize};

use crate::error::{UserError, UserResult};

/// Details a user may correct after registering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub name: String,
}

/// A registered user as carried on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub details: UserDetails,
    pub email: String,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            details: UserDetails { name: name.into() },
            email: email.into(),
        }
    }

    /// Reject users with an empty id, name or email.
    pub fn validate(&self) -> UserResult<()> {
        let missing = [
            ("id", &self.id),
            ("name", &self.details.name),
            ("email", &self.email),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty());

        match missing {
            Some((field, _)) => Err(UserError::Invalid(format!("{field} must not be empty"))),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: UserDetails) -> Self {
        self.details = details;
        self
    }
}
