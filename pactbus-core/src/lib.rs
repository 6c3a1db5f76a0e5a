//! Event bus abstractions for pactbus.
//!
//! Producers publish strongly typed events; consumers register handlers
//! under a listener group name. Each publish reaches exactly one handler per
//! listener group, picked at random among the group's replicas.
//!
//! # Key Types
//!
//! - [`EventBus`] - Trait for publishing and listening
//! - [`InMemoryEventBus`] - Process-local implementation
//! - [`EventHandler`] / [`TypedHandler`] - Consumers of one event type
//! - [`ListenerGroups`] - Replica selection for one event key
//! - [`EventSniffer`] - Captures events for assertions
//! - [`BusConfig`] - Mode and broker settings

pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod groups;
pub mod handler;
pub mod memory;
pub mod sniffer;

// Re-exports
pub use bus::EventBus;
pub use config::{AckPolicy, BusConfig, BusMode, RabbitMqConfig};
pub use error::{BoxError, Error, HandlerError, Result};
pub use event::{DomainEvent, Event, EventDefinition, EventKey, Payload};
pub use groups::ListenerGroups;
pub use handler::{EventHandler, HandlerFuture, TypedHandler};
pub use memory::InMemoryEventBus;
pub use sniffer::{EventSniffer, SNIFFER_LISTENER};
