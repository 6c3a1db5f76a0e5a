//! User collaborators of the pactbus event bus.
//!
//! [`UserRegistry`] produces user events; [`UserProjection`] consumes them
//! through [`projection_handlers`] to answer text searches.
//!
//! # Key Types
//!
//! - [`User`] / [`UserDetails`] - Wire model
//! - [`NewUserRegistered`], [`UserDetailsCorrected`], [`UserDeleted`] - Events
//! - [`UserRegistry`] - Register, correct and delete users
//! - [`UserProjection`] - Search read model

pub mod error;
pub mod events;
pub mod model;
pub mod projection;
pub mod registry;

// Re-exports
pub use error::{UserError, UserResult};
pub use events::{DOMAIN, NewUserRegistered, UserDeleted, UserDetailsCorrected, all_definitions};
pub use model::{User, UserDetails};
pub use projection::{LISTENER_NAME, ProjectedUser, UserProjection, projection_handlers};
pub use registry::UserRegistry;
