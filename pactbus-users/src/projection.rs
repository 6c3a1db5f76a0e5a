//! Search projection over user events.
//!
//! Keeps a read model of users indexed by exact name and email text, fed by
//! the handlers from [`projection_handlers`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use pactbus_core::{EventHandler, HandlerError, TypedHandler};

use crate::error::{UserError, UserResult};
use crate::events::{NewUserRegistered, UserDeleted, UserDetailsCorrected};
use crate::model::User;

/// Listener group of the projection handlers.
pub const LISTENER_NAME: &str = "projection";

/// Flattened user as the projection stores it. Empty fields mean "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectedUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl ProjectedUser {
    /// Overlay the non-empty fields of `update`.
    #[must_use]
    pub fn update_with(mut self, update: ProjectedUser) -> Self {
        if !update.name.is_empty() {
            self.name = update.name;
        }
        if !update.email.is_empty() {
            self.email = update.email;
        }
        self
    }

    fn search_terms(&self) -> impl Iterator<Item = &str> {
        [self.name.as_str(), self.email.as_str()]
            .into_iter()
            .filter(|text| !text.is_empty())
    }
}

impl From<User> for ProjectedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.details.name,
            email: user.email,
        }
    }
}

impl From<&UserDetailsCorrected> for ProjectedUser {
    fn from(event: &UserDetailsCorrected) -> Self {
        Self {
            id: event.user_id.clone(),
            name: event.new_user_details.name.clone(),
            email: String::new(),
        }
    }
}

#[derive(Default)]
struct Index {
    users: HashMap<String, ProjectedUser>,
    patterns: HashMap<String, BTreeSet<String>>,
}

impl Index {
    fn unlink(&mut self, user: &ProjectedUser) {
        for text in user.search_terms() {
            if let Some(ids) = self.patterns.get_mut(text) {
                ids.remove(&user.id);
                if ids.is_empty() {
                    self.patterns.remove(text);
                }
            }
        }
    }

    fn link(&mut self, user: &ProjectedUser) {
        for text in user.search_terms() {
            self.patterns
                .entry(text.to_string())
                .or_default()
                .insert(user.id.clone());
        }
    }
}

#[derive(Default)]
pub struct UserProjection {
    index: RwLock<Index>,
}

impl UserProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user, or merge it into the one already indexed under its id.
    pub async fn index_user(&self, user: ProjectedUser) -> UserResult<()> {
        if user.id.is_empty() {
            return Err(UserError::Invalid("id must not be empty".to_string()));
        }

        let mut index = self.index.write().await;
        let merged = match index.users.remove(&user.id) {
            Some(existing) => {
                index.unlink(&existing);
                existing.update_with(user)
            }
            None => user,
        };
        index.link(&merged);
        debug!(user_id = %merged.id, "Indexed user");
        index.users.insert(merged.id.clone(), merged);
        Ok(())
    }

    pub async fn delete_user_by_id(&self, user_id: &str) -> UserResult<()> {
        let mut index = self.index.write().await;
        let user = index
            .users
            .remove(user_id)
            .ok_or_else(|| UserError::NotFound(user_id.to_string()))?;
        index.unlink(&user);
        debug!(user_id, "Removed user from projection");
        Ok(())
    }

    /// Users whose name or email equals `text`, ordered by id.
    pub async fn find_users_by_text(&self, text: &str) -> Vec<ProjectedUser> {
        let index = self.index.read().await;
        index
            .patterns
            .get(text)
            .into_iter()
            .flatten()
            .filter_map(|id| index.users.get(id).cloned())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Handlers keeping `projection` in sync, all in the [`LISTENER_NAME`] group.
pub fn projection_handlers(projection: Arc<UserProjection>) -> Vec<Arc<dyn EventHandler>> {
    info!(listener = LISTENER_NAME, "Building projection handlers");

    let registered = {
        let projection = Arc::clone(&projection);
        TypedHandler::new(LISTENER_NAME, move |event: NewUserRegistered| {
            let projection = Arc::clone(&projection);
            async move {
                projection
                    .index_user(event.user.into())
                    .await
                    .map_err(HandlerError::from)
            }
        })
    };

    let corrected = {
        let projection = Arc::clone(&projection);
        TypedHandler::new(LISTENER_NAME, move |event: UserDetailsCorrected| {
            let projection = Arc::clone(&projection);
            async move {
                projection
                    .index_user(ProjectedUser::from(&event))
                    .await
                    .map_err(HandlerError::from)
            }
        })
    };

    let deleted = TypedHandler::new(LISTENER_NAME, move |event: UserDeleted| {
        let projection = Arc::clone(&projection);
        async move {
            projection
                .delete_user_by_id(&event.user_id)
                .await
                .map_err(HandlerError::from)
        }
    });

    vec![registered.into_arc(), corrected.into_arc(), deleted.into_arc()]
}
