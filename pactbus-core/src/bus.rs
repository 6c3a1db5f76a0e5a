//! EventBus trait definition

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::event::Event;
use crate::handler::EventHandler;

/// Publish/subscribe router keyed by event definition.
///
/// Implementations must support:
/// - Fan-out across listener groups, one handler per group per publish
/// - Handler failures isolated to the handler's `on_error` callback
/// - Publishing with no registered listeners as a successful no-op
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Deliver an event to one handler of every interested listener group.
    async fn publish(&self, event: Event) -> Result<()>;

    /// Register `handlers` under the listener group `listener_name`.
    ///
    /// In-process buses return immediately. Broker-backed buses consume
    /// until the delivery stream ends and then return an error.
    async fn listen(&self, listener_name: &str, handlers: Vec<Arc<dyn EventHandler>>)
    -> Result<()>;

    /// Release resources held by the bus. Safe to call more than once.
    async fn close(&self) -> Result<()>;
}
