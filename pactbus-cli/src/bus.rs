//! Builds the event bus selected by configuration.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use pactbus_core::{BusConfig, BusMode, EventBus, InMemoryEventBus};
use pactbus_rabbitmq::RabbitMqEventBus;

pub fn load_config(path: Option<&Path>) -> Result<BusConfig> {
    BusConfig::load(path).context("Failed to load bus configuration")
}

pub async fn build_event_bus(config: &BusConfig) -> Result<Arc<dyn EventBus>> {
    info!(mode = ?config.mode, "Building event bus");
    let bus: Arc<dyn EventBus> = match config.mode {
        BusMode::InMemory => Arc::new(InMemoryEventBus::new()),
        BusMode::RabbitMq => Arc::new(
            RabbitMqEventBus::connect(config.rabbitmq.clone())
                .await
                .with_context(|| format!("Failed to connect to {}", redact(&config.rabbitmq.url)))?,
        ),
    };
    Ok(bus)
}

/// Drop the password from an AMQP URL before it is shown.
fn redact(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.split_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_string(),
    }
}

/// Resolve once the process is asked to stop.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
