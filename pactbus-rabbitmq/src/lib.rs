//! RabbitMQ-backed event bus for pactbus.
//!
//! Implements [`pactbus_core::EventBus`] on top of an AMQP 0-9-1 broker:
//!
//! - one durable topic exchange per event domain
//! - the event name as routing key
//! - one durable queue per listener group, shared by its replicas
//! - `event.domain` / `event.type` headers and a JSON body on every message
//!
//! # Key Types
//!
//! - [`RabbitMqEventBus`] - Broker-backed bus
//! - [`DeliveryRouter`] - Decodes deliveries and decides how to settle them
//! - [`EventHeaders`] - Header codec

pub mod bus;
pub mod error;
pub mod headers;
pub mod router;
pub mod topology;

// Re-exports
pub use bus::RabbitMqEventBus;
pub use error::{Error, Result};
pub use headers::{EVENT_DOMAIN, EVENT_TYPE, EventHeaders};
pub use router::{DeliveryRouter, Disposition};
