//! Event model: definitions, keys and published events.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Identifies an event type by its domain namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventDefinition {
    domain: String,
    name: String,
}

impl EventDefinition {
    pub fn new(domain: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Routing key binding this definition to listener groups.
    pub fn key(&self) -> EventKey {
        EventKey(format!("{}/{}", self.domain, self.name))
    }
}

impl fmt::Display for EventDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.name)
    }
}

/// `domain/name`, used as the map key from definitions to listener groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey(String);

impl EventKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A strongly typed event payload belonging to a fixed definition.
///
/// Implementors are the concrete event structs published by producers
/// (e.g. `NewUserRegistered`). The JSON shape of the struct is the wire body
/// used by broker-backed buses.
pub trait DomainEvent: Serialize + DeserializeOwned + fmt::Debug + Send + Sync + 'static {
    /// Domain namespace, e.g. `"user"`.
    const DOMAIN: &'static str;
    /// Event name, e.g. `"NewUserRegistered"`.
    const NAME: &'static str;

    /// Identifier of the aggregate this event concerns.
    fn entity_id(&self) -> String;

    fn definition() -> EventDefinition {
        EventDefinition::new(Self::DOMAIN, Self::NAME)
    }
}

/// Type-erased payload carried by an [`Event`].
pub trait Payload: Any + Send + Sync + fmt::Debug {
    /// Serialize the payload to a JSON document.
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;

    fn as_any(&self) -> &dyn Any;
}

impl<T> Payload for T
where
    T: Serialize + Any + Send + Sync + fmt::Debug,
{
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A published occurrence of an event type.
///
/// Cloning is cheap: the payload is shared, never copied.
#[derive(Debug, Clone)]
pub struct Event {
    definition: EventDefinition,
    entity_id: String,
    payload: Arc<dyn Payload>,
}

impl Event {
    pub fn new(
        definition: EventDefinition,
        entity_id: impl Into<String>,
        payload: impl Payload,
    ) -> Self {
        Self {
            definition,
            entity_id: entity_id.into(),
            payload: Arc::new(payload),
        }
    }

    /// Build an event from a typed domain event.
    pub fn from_domain<E: DomainEvent>(event: E) -> Self {
        let entity_id = event.entity_id();
        Self::new(E::definition(), entity_id, event)
    }

    /// Wrap a body that could not be decoded so error callbacks still get an event.
    pub fn raw(definition: EventDefinition, body: &[u8]) -> Self {
        Self::new(definition, "", String::from_utf8_lossy(body).into_owned())
    }

    pub fn definition(&self) -> &EventDefinition {
        &self.definition
    }

    pub fn key(&self) -> EventKey {
        self.definition.key()
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn payload(&self) -> &dyn Payload {
        &*self.payload
    }

    /// Borrow the payload as its concrete type, if it is one.
    pub fn payload_as<T: Any>(&self) -> Option<&T> {
        self.payload().as_any().downcast_ref::<T>()
    }

    /// Decode the payload into `E`, re-reading its JSON form when the payload
    /// is not natively an `E` (e.g. a `serde_json::Value` or a foreign struct).
    pub fn decode<E: DomainEvent + Clone>(&self) -> serde_json::Result<E> {
        match self.payload_as::<E>() {
            Some(event) => Ok(event.clone()),
            None => serde_json::from_slice(&self.to_json()?),
        }
    }

    /// Serialize the payload to JSON.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        self.payload().to_json()
    }
}
