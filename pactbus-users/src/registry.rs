//! User registry: the producing side of the user events.
//!
//! Every mutation commits to the store first and publishes afterwards. A
//! failed publish is logged and the mutation stays.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info};

use pactbus_core::{DomainEvent, Event, EventBus};

use crate::error::{UserError, UserResult};
use crate::events::{NewUserRegistered, UserDeleted, UserDetailsCorrected};
use crate::model::{User, UserDetails};

#[derive(Default)]
struct Store {
    users: HashMap<String, User>,
    emails: HashMap<String, String>,
}

pub struct UserRegistry {
    store: RwLock<Store>,
    bus: Arc<dyn EventBus>,
}

impl UserRegistry {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self {
            store: RwLock::new(Store::default()),
            bus,
        }
    }

    /// Register a new user and publish [`NewUserRegistered`].
    pub async fn register_new_user(&self, user: User) -> UserResult<()> {
        user.validate()?;
        {
            let mut store = self.store.write().await;
            if store.emails.contains_key(&user.email) {
                return Err(UserError::AlreadyExists(format!("email {}", user.email)));
            }
            if store.users.contains_key(&user.id) {
                return Err(UserError::AlreadyExists(format!("id {}", user.id)));
            }
            store.emails.insert(user.email.clone(), user.id.clone());
            store.users.insert(user.id.clone(), user.clone());
        }
        info!(user_id = %user.id, "Registered user");

        self.publish(NewUserRegistered { user }).await;
        Ok(())
    }

    /// Replace a user's details and publish [`UserDetailsCorrected`].
    pub async fn correct_user_details(&self, user_id: &str, details: UserDetails) -> UserResult<()> {
        if details.name.trim().is_empty() {
            return Err(UserError::Invalid("name must not be empty".to_string()));
        }
        {
            let mut store = self.store.write().await;
            let user = store
                .users
                .get_mut(user_id)
                .ok_or_else(|| UserError::NotFound(user_id.to_string()))?;
            user.details = details.clone();
        }
        info!(user_id, "Corrected user details");

        self.publish(UserDetailsCorrected {
            user_id: user_id.to_string(),
            new_user_details: details,
        })
        .await;
        Ok(())
    }

    /// Remove a user and publish [`UserDeleted`].
    pub async fn delete_user(&self, user_id: &str) -> UserResult<()> {
        {
            let mut store = self.store.write().await;
            let user = store
                .users
                .remove(user_id)
                .ok_or_else(|| UserError::NotFound(user_id.to_string()))?;
            store.emails.remove(&user.email);
        }
        info!(user_id, "Deleted user");

        self.publish(UserDeleted {
            user_id: user_id.to_string(),
        })
        .await;
        Ok(())
    }

    pub async fn find_user_by_id(&self, user_id: &str) -> UserResult<User> {
        self.store
            .read()
            .await
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| UserError::NotFound(user_id.to_string()))
    }

    /// All users, ordered by id.
    pub async fn list_all_users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.store.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }

    async fn publish<E: DomainEvent>(&self, event: E) {
        let event = Event::from_domain(event);
        match self.bus.publish(event.clone()).await {
            Ok(()) => debug!(event_key = %event.key(), entity_id = event.entity_id(), "Published"),
            Err(e) => error!(
                event_key = %event.key(),
                entity_id = event.entity_id(),
                error = %e,
                "Could not publish event"
            ),
        }
    }
}
