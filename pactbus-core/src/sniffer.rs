//! Event sniffer: captures events seen on a bus for later inspection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, RwLock};
use tokio::time::Instant;
use tracing::warn;

use crate::bus::EventBus;
use crate::error::{HandlerError, Result};
use crate::event::{Event, EventDefinition};
use crate::handler::EventHandler;

/// Listener group used by every sniffer.
pub const SNIFFER_LISTENER: &str = "event-sniffer";

#[derive(Default)]
struct Captured {
    events: RwLock<Vec<Event>>,
    arrived: Notify,
}

/// Records events in arrival order.
///
/// With a broker-backed bus `listen` consumes until the connection ends, so
/// run it on its own task and read the captured events from another.
#[derive(Clone)]
pub struct EventSniffer {
    bus: Arc<dyn EventBus>,
    captured: Arc<Captured>,
}

impl EventSniffer {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self {
            bus,
            captured: Arc::new(Captured::default()),
        }
    }

    /// Subscribe to `definitions` under the [`SNIFFER_LISTENER`] group.
    pub async fn listen(&self, definitions: impl IntoIterator<Item = EventDefinition>) -> Result<()> {
        let handlers = definitions
            .into_iter()
            .map(|definition| {
                Arc::new(SniffingHandler {
                    definition,
                    captured: Arc::clone(&self.captured),
                }) as Arc<dyn EventHandler>
            })
            .collect();

        self.bus.listen(SNIFFER_LISTENER, handlers).await
    }

    pub async fn clear(&self) {
        self.captured.events.write().await.clear();
    }

    /// Snapshot of the captured events.
    pub async fn events(&self) -> Vec<Event> {
        self.captured.events.read().await.clone()
    }

    /// Snapshot of the captured events, clearing them in the same step.
    pub async fn take_events(&self) -> Vec<Event> {
        std::mem::take(&mut *self.captured.events.write().await)
    }

    /// Wait until at least `count` events are captured or `timeout` passes,
    /// then return the snapshot.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Event> {
        let deadline = Instant::now() + timeout;
        loop {
            let arrived = self.captured.arrived.notified();
            {
                let events = self.captured.events.read().await;
                if events.len() >= count {
                    return events.clone();
                }
            }
            if tokio::time::timeout_at(deadline, arrived).await.is_err() {
                return self.events().await;
            }
        }
    }
}

struct SniffingHandler {
    definition: EventDefinition,
    captured: Arc<Captured>,
}

#[async_trait]
impl EventHandler for SniffingHandler {
    fn listener_name(&self) -> &str {
        SNIFFER_LISTENER
    }

    fn wanted_event(&self) -> &EventDefinition {
        &self.definition
    }

    async fn process(&self, event: &Event) -> std::result::Result<(), HandlerError> {
        self.captured.events.write().await.push(event.clone());
        self.captured.arrived.notify_waiters();
        Ok(())
    }

    fn on_error(&self, event: &Event, error: &HandlerError) {
        warn!(event_key = %event.key(), error = %error, "Sniffer could not record event");
    }
}
