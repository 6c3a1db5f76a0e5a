//! Runs the user search projection as a listener group.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use pactbus_core::{BusConfig, BusMode};
use pactbus_users::{LISTENER_NAME, UserProjection, projection_handlers};

use crate::bus::{build_event_bus, shutdown_signal};

#[derive(Debug, Args)]
pub struct ProjectArgs {}

pub async fn run(_args: ProjectArgs, config: &BusConfig) -> Result<()> {
    let bus = build_event_bus(config).await?;
    let projection = Arc::new(UserProjection::new());
    let handlers = projection_handlers(Arc::clone(&projection));

    info!(listener = LISTENER_NAME, "Starting projection");
    let outcome = match config.mode {
        BusMode::InMemory => {
            bus.listen(LISTENER_NAME, handlers)
                .await
                .context("Failed to register projection")?;
            shutdown_signal().await;
            Ok(())
        }
        BusMode::RabbitMq => {
            tokio::select! {
                result = bus.listen(LISTENER_NAME, handlers) => {
                    result.context("Projection stopped consuming")
                }
                () = shutdown_signal() => Ok(()),
            }
        }
    };

    info!(users = projection.len().await, "Projection stopped");
    bus.close().await?;
    outcome
}
