//! Registers a user, which publishes `NewUserRegistered`.

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use pactbus_core::{BusConfig, BusMode};
use pactbus_users::{User, UserRegistry};

use crate::bus::build_event_bus;

#[derive(Debug, Args)]
pub struct PublishArgs {
    /// User id
    #[arg(long)]
    pub id: String,

    /// Display name
    #[arg(long)]
    pub name: String,

    /// Email address
    #[arg(long)]
    pub email: String,
}

pub async fn run(args: PublishArgs, config: &BusConfig) -> Result<()> {
    if config.mode == BusMode::InMemory {
        warn!("In-memory bus: no other process will receive this event");
    }

    let bus = build_event_bus(config).await?;
    let registry = UserRegistry::new(bus.clone());

    let user = User::new(args.id, args.name, args.email);
    registry
        .register_new_user(user.clone())
        .await
        .with_context(|| format!("Failed to register user {}", user.id))?;
    info!(user_id = %user.id, "User registered");

    bus.close().await?;
    Ok(())
}
