//! In-memory EventBus implementation
//!
//! InMemoryEventBus keeps the listener groups of every event key in a map
//! and dispatches synchronously on the publisher's task.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::bus::EventBus;
use crate::error::Result;
use crate::event::{Event, EventKey};
use crate::groups::ListenerGroups;
use crate::handler::EventHandler;

/// Process-local event bus.
///
/// `publish` returns once every selected handler has run. Nothing is
/// persisted; events published before a listener registers are lost.
pub struct InMemoryEventBus {
    handlers: RwLock<HashMap<EventKey, ListenerGroups>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        info!("Starting in-memory event bus");
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Number of listener groups registered for `key`.
    pub async fn listener_count(&self, key: &EventKey) -> usize {
        self.handlers.read().await.get(key).map_or(0, ListenerGroups::len)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, event: Event) -> Result<()> {
        let key = event.key();

        // Pick representatives under the lock, run them without it so a
        // handler may itself publish or listen.
        let selected = match self.handlers.read().await.get(&key) {
            Some(groups) => groups.select_representatives(),
            None => {
                debug!(event_key = %key, "No listeners, dropping event");
                return Ok(());
            }
        };

        for handler in selected {
            if let Err(error) = handler.process(&event).await {
                handler.on_error(&event, &error);
            }
        }

        Ok(())
    }

    async fn listen(
        &self,
        listener_name: &str,
        handlers: Vec<Arc<dyn EventHandler>>,
    ) -> Result<()> {
        let mut registry = self.handlers.write().await;
        for handler in handlers {
            let key = handler.wanted_event().key();
            debug!(listener = listener_name, event_key = %key, "Registering handler");
            registry
                .entry(key)
                .or_default()
                .add_handler(listener_name, handler);
        }

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        info!("Closing in-memory event bus");
        self.handlers.write().await.clear();
        Ok(())
    }
}
