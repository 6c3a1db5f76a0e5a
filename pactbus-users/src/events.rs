//! Events published by the user registry.

use serde::{Deserialize, Serialize};

use pactbus_core::{DomainEvent, EventDefinition};

use crate::model::{User, UserDetails};

/// Domain shared by every user event.
pub const DOMAIN: &str = "user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUserRegistered {
    pub user: User,
}

impl DomainEvent for NewUserRegistered {
    const DOMAIN: &'static str = DOMAIN;
    const NAME: &'static str = "NewUserRegistered";

    fn entity_id(&self) -> String {
        self.user.id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetailsCorrected {
    pub user_id: String,
    pub new_user_details: UserDetails,
}

impl DomainEvent for UserDetailsCorrected {
    const DOMAIN: &'static str = DOMAIN;
    const NAME: &'static str = "UserDetailsCorrected";

    fn entity_id(&self) -> String {
        self.user_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeleted {
    pub user_id: String,
}

impl DomainEvent for UserDeleted {
    const DOMAIN: &'static str = DOMAIN;
    const NAME: &'static str = "UserDeleted";

    fn entity_id(&self) -> String {
        self.user_id.clone()
    }
}

/// Definitions of every user event, e.g. for a sniffer.
pub fn all_definitions() -> Vec<EventDefinition> {
    vec![
        NewUserRegistered::definition(),
        UserDetailsCorrected::definition(),
        UserDeleted::definition(),
    ]
}
