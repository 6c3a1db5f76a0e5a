//! Exchange, queue and binding declarations.
//!
//! - event domain -> durable topic exchange
//! - event name -> routing key for publish and binding
//! - listener name -> durable, shared queue

use std::sync::Arc;

use lapin::options::{
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions, QueueDeleteOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, ExchangeKind};
use tracing::{debug, warn};

use pactbus_core::{EventDefinition, EventHandler};

use crate::error::Result;

pub(crate) fn exchange_options() -> ExchangeDeclareOptions {
    ExchangeDeclareOptions {
        durable: true,
        auto_delete: false,
        internal: false,
        ..ExchangeDeclareOptions::default()
    }
}

pub(crate) fn queue_options() -> QueueDeclareOptions {
    QueueDeclareOptions {
        durable: true,
        exclusive: false,
        auto_delete: false,
        ..QueueDeclareOptions::default()
    }
}

/// Declare the topic exchange for the definition's domain.
pub async fn declare_exchange(channel: &Channel, definition: &EventDefinition) -> Result<()> {
    channel
        .exchange_declare(
            definition.domain(),
            ExchangeKind::Topic,
            exchange_options(),
            FieldTable::default(),
        )
        .await?;
    Ok(())
}

/// Declare the listener queue and bind it to every handler's event.
///
/// On failure the queue is deleted again before the error is returned.
pub async fn create_queue(
    channel: &Channel,
    listener_name: &str,
    handlers: &[Arc<dyn EventHandler>],
) -> Result<()> {
    channel
        .queue_declare(listener_name, queue_options(), FieldTable::default())
        .await?;

    for handler in handlers {
        if let Err(e) = bind(channel, listener_name, handler.wanted_event()).await {
            delete_queue(channel, listener_name).await;
            return Err(e);
        }
    }

    Ok(())
}

async fn bind(channel: &Channel, queue: &str, definition: &EventDefinition) -> Result<()> {
    declare_exchange(channel, definition).await?;
    channel
        .queue_bind(
            queue,
            definition.domain(),
            definition.name(),
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;
    debug!(queue, event_key = %definition.key(), "Bound queue");
    Ok(())
}

async fn delete_queue(channel: &Channel, queue: &str) {
    if let Err(e) = channel
        .queue_delete(queue, QueueDeleteOptions::default())
        .await
    {
        warn!(queue, error = %e, "Could not delete queue after failed binding");
    }
}
