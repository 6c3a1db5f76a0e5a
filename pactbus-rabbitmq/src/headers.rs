//! Message headers identifying the event carried by a delivery.
//!
//! Exchange and routing key already encode domain and name, but consumers
//! only see the queue, so both are repeated as headers.

use lapin::types::{AMQPValue, FieldTable, LongString, ShortString};

use pactbus_core::EventDefinition;

/// Header holding the event domain.
pub const EVENT_DOMAIN: &str = "event.domain";
/// Header holding the event name.
pub const EVENT_TYPE: &str = "event.type";

/// Domain and name read back from a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHeaders {
    pub domain: String,
    pub event_type: String,
}

impl EventHeaders {
    pub fn from_definition(definition: &EventDefinition) -> Self {
        Self {
            domain: definition.domain().to_string(),
            event_type: definition.name().to_string(),
        }
    }

    /// Read both headers; `None` when either is missing or not text.
    pub fn from_table(table: &FieldTable) -> Option<Self> {
        let inner = table.inner();
        let domain = inner.get(&ShortString::from(EVENT_DOMAIN)).and_then(text)?;
        let event_type = inner.get(&ShortString::from(EVENT_TYPE)).and_then(text)?;
        Some(Self { domain, event_type })
    }

    pub fn to_table(&self) -> FieldTable {
        let mut table = FieldTable::default();
        table.insert(
            EVENT_DOMAIN.into(),
            AMQPValue::LongString(LongString::from(self.domain.as_str())),
        );
        table.insert(
            EVENT_TYPE.into(),
            AMQPValue::LongString(LongString::from(self.event_type.as_str())),
        );
        table
    }

    pub fn definition(&self) -> EventDefinition {
        EventDefinition::new(&self.domain, &self.event_type)
    }
}

fn text(value: &AMQPValue) -> Option<String> {
    match value {
        AMQPValue::LongString(s) => Some(String::from_utf8_lossy(s.as_bytes()).into_owned()),
        AMQPValue::ShortString(s) => Some(s.as_str().to_string()),
        _ => None,
    }
}
