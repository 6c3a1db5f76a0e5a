//! Event handlers: the consumer side of the bus.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::HandlerError;
use crate::event::{DomainEvent, Event, EventDefinition};

/// A named consumer of one event type.
///
/// The bus holds handlers behind `Arc` for as long as the listen
/// registration lives; the registering service keeps its own handle.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Listener group this handler belongs to.
    fn listener_name(&self) -> &str;

    /// The event type this handler wants to receive.
    fn wanted_event(&self) -> &EventDefinition;

    /// Process one event.
    async fn process(&self, event: &Event) -> Result<(), HandlerError>;

    /// Called by the bus when `process` (or decoding) fails.
    fn on_error(&self, event: &Event, error: &HandlerError) {
        warn!(
            listener = self.listener_name(),
            event_key = %event.key(),
            entity_id = event.entity_id(),
            error = %error,
            "Could not process event"
        );
    }

    /// Turn a JSON wire body into an event of the wanted type.
    ///
    /// Used by broker-backed buses to recover the concrete payload type.
    /// The default keeps the body as a `serde_json::Value`.
    fn decode(&self, body: &[u8]) -> Result<Event, HandlerError> {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        Ok(Event::new(self.wanted_event().clone(), "", value))
    }
}

/// Future returned by handler closures.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>>;

type ProcessFn<E> = Arc<dyn Fn(E) -> HandlerFuture + Send + Sync>;
type ErrorFn = Arc<dyn Fn(&Event, &HandlerError) + Send + Sync>;

/// Closure-backed handler for a single [`DomainEvent`] type.
///
/// ```ignore
/// let handler = TypedHandler::new("projection", move |event: NewUserRegistered| {
///     let projection = projection.clone();
///     async move { projection.index_user(event.user.into()).await }
/// });
/// ```
pub struct TypedHandler<E> {
    listener_name: String,
    definition: EventDefinition,
    process: ProcessFn<E>,
    on_error: Option<ErrorFn>,
    _event: PhantomData<fn() -> E>,
}

impl<E> TypedHandler<E>
where
    E: DomainEvent + Clone,
{
    pub fn new<F, Fut>(listener_name: impl Into<String>, process: F) -> Self
    where
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self {
            listener_name: listener_name.into(),
            definition: E::definition(),
            process: Arc::new(move |event| Box::pin(process(event))),
            on_error: None,
            _event: PhantomData,
        }
    }

    /// Replace the default logging error callback.
    #[must_use]
    pub fn with_error_handler<F>(mut self, on_error: F) -> Self
    where
        F: Fn(&Event, &HandlerError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(on_error));
        self
    }

    pub fn into_arc(self) -> Arc<dyn EventHandler> {
        Arc::new(self)
    }
}

#[async_trait]
impl<E> EventHandler for TypedHandler<E>
where
    E: DomainEvent + Clone,
{
    fn listener_name(&self) -> &str {
        &self.listener_name
    }

    fn wanted_event(&self) -> &EventDefinition {
        &self.definition
    }

    async fn process(&self, event: &Event) -> Result<(), HandlerError> {
        if event.definition() != &self.definition {
            return Err(HandlerError::UnexpectedPayload {
                expected: self.definition.to_string(),
            });
        }
        let payload = event.decode::<E>()?;
        (self.process)(payload).await
    }

    fn on_error(&self, event: &Event, error: &HandlerError) {
        match &self.on_error {
            Some(on_error) => on_error(event, error),
            None => warn!(
                listener = %self.listener_name,
                event_key = %event.key(),
                entity_id = event.entity_id(),
                error = %error,
                "Could not process event"
            ),
        }
    }

    fn decode(&self, body: &[u8]) -> Result<Event, HandlerError> {
        let payload: E = serde_json::from_slice(body)?;
        Ok(Event::from_domain(payload))
    }
}
