//! RabbitMQ EventBus implementation
//!
//! Every publish opens its own channel and closes it afterwards. Every
//! `listen` call owns a channel for as long as its consumer runs.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use pactbus_core::{Event, EventBus, EventHandler, RabbitMqConfig};

use crate::error::{Error, Result};
use crate::headers::EventHeaders;
use crate::router::{DeliveryRouter, Disposition};
use crate::topology;

const CONTENT_TYPE: &str = "application/json";
const REPLY_SUCCESS: u16 = 200;

/// Event bus backed by a RabbitMQ broker.
///
/// Listener groups map to durable queues named after the listener, so
/// replicas in different processes share one queue and the broker hands
/// each message to one of them.
pub struct RabbitMqEventBus {
    connection: RwLock<Option<Connection>>,
    config: RabbitMqConfig,
}

impl RabbitMqEventBus {
    /// Connect to the broker at `config.url`.
    pub async fn connect(config: RabbitMqConfig) -> pactbus_core::Result<Self> {
        info!(ack_policy = ?config.ack_policy, prefetch = config.prefetch, "Connecting to RabbitMQ");
        let connection = Connection::connect(&config.url, ConnectionProperties::default())
            .await
            .map_err(Error::from)?;
        info!("Connected to RabbitMQ");

        Ok(Self {
            connection: RwLock::new(Some(connection)),
            config,
        })
    }

    pub fn config(&self) -> &RabbitMqConfig {
        &self.config
    }

    async fn channel(&self) -> Result<Channel> {
        let connection = self.connection.read().await;
        let connection = connection.as_ref().ok_or(Error::Closed)?;
        Ok(connection.create_channel().await?)
    }

    async fn publish_on(&self, channel: &Channel, event: &Event) -> Result<()> {
        let definition = event.definition();
        topology::declare_exchange(channel, definition).await?;

        let body = event.to_json()?;
        let properties = BasicProperties::default()
            .with_content_type(CONTENT_TYPE.into())
            .with_headers(EventHeaders::from_definition(definition).to_table());

        channel
            .basic_publish(
                definition.domain(),
                definition.name(),
                BasicPublishOptions {
                    mandatory: true,
                    ..BasicPublishOptions::default()
                },
                &body,
                properties,
            )
            .await?
            .await?;

        debug!(event_key = %event.key(), entity_id = event.entity_id(), "Published event");
        Ok(())
    }

    async fn consume(
        &self,
        channel: &Channel,
        listener_name: &str,
        handlers: &[Arc<dyn EventHandler>],
    ) -> pactbus_core::Result<()> {
        topology::create_queue(channel, listener_name, handlers)
            .await
            .map_err(|e| pactbus_core::Error::Topology {
                listener: listener_name.to_string(),
                source: Box::new(e),
            })?;

        if self.config.prefetch > 0 {
            channel
                .basic_qos(self.config.prefetch, BasicQosOptions::default())
                .await
                .map_err(Error::from)?;
        }

        let mut consumer = channel
            .basic_consume(
                listener_name,
                "",
                BasicConsumeOptions {
                    no_local: true,
                    no_ack: false,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(Error::from)?;

        let router = DeliveryRouter::new(listener_name, handlers, self.config.ack_policy);
        info!(listener = listener_name, handlers = handlers.len(), "Listening");

        while let Some(delivery) = consumer.next().await {
            let delivery = match delivery {
                Ok(delivery) => delivery,
                Err(e) => {
                    warn!(listener = listener_name, error = %e, "Consumer failed");
                    break;
                }
            };

            let headers = delivery
                .properties
                .headers()
                .as_ref()
                .and_then(EventHeaders::from_table);
            let disposition = router
                .route(headers.as_ref(), &delivery.data, delivery.redelivered)
                .await;
            settle(&delivery, disposition).await.map_err(Error::from)?;
        }

        info!(listener = listener_name, "Consumer stopped");
        Err(pactbus_core::Error::NoMoreMessages {
            listener: listener_name.to_string(),
        })
    }
}

async fn settle(delivery: &Delivery, disposition: Disposition) -> lapin::Result<()> {
    match disposition {
        Disposition::Ack => delivery.acker.ack(BasicAckOptions::default()).await,
        Disposition::Requeue | Disposition::Discard => {
            delivery
                .acker
                .nack(BasicNackOptions {
                    requeue: disposition == Disposition::Requeue,
                    ..BasicNackOptions::default()
                })
                .await
        }
    }
}

async fn close_channel(channel: &Channel) {
    if let Err(e) = channel.close(REPLY_SUCCESS, "OK").await {
        debug!(error = %e, "Could not close channel");
    }
}

#[async_trait]
impl EventBus for RabbitMqEventBus {
    async fn publish(&self, event: Event) -> pactbus_core::Result<()> {
        let channel = self.channel().await?;
        let result = self.publish_on(&channel, &event).await;
        close_channel(&channel).await;
        if let Err(e) = &result {
            warn!(event_key = %event.key(), error = %e, "Could not publish event");
        }
        Ok(result?)
    }

    /// Declare the listener's queue and bindings, then consume until the
    /// broker stops delivering. Only returns on failure, with
    /// [`pactbus_core::Error::NoMoreMessages`] once the consumer ends.
    async fn listen(
        &self,
        listener_name: &str,
        handlers: Vec<Arc<dyn EventHandler>>,
    ) -> pactbus_core::Result<()> {
        let channel = self.channel().await?;
        let result = self.consume(&channel, listener_name, &handlers).await;
        close_channel(&channel).await;
        result
    }

    async fn close(&self) -> pactbus_core::Result<()> {
        let Some(connection) = self.connection.write().await.take() else {
            return Ok(());
        };
        info!("Closing RabbitMQ connection");
        connection
            .close(REPLY_SUCCESS, "OK")
            .await
            .map_err(Error::from)?;
        Ok(())
    }
}
