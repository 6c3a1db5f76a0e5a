//! Routes broker deliveries to the handler registered for their event name.
//!
//! The handler doubles as the payload factory: its `decode` turns the JSON
//! body into the concrete event type it expects.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use pactbus_core::{AckPolicy, Event, EventHandler, HandlerError};

use crate::headers::EventHeaders;

/// What to tell the broker about a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    /// Negative ack, redeliver.
    Requeue,
    /// Negative ack, drop.
    Discard,
}

/// Handlers of one `listen` call, keyed by event name.
pub struct DeliveryRouter {
    listener: String,
    handlers: HashMap<String, Arc<dyn EventHandler>>,
    policy: AckPolicy,
}

impl DeliveryRouter {
    pub fn new(listener: &str, handlers: &[Arc<dyn EventHandler>], policy: AckPolicy) -> Self {
        let mut by_name = HashMap::new();
        for handler in handlers {
            let name = handler.wanted_event().name().to_string();
            if by_name.insert(name.clone(), Arc::clone(handler)).is_some() {
                warn!(listener, event_type = %name, "Several handlers for one event name, keeping the last");
            }
        }

        Self {
            listener: listener.to_string(),
            handlers: by_name,
            policy,
        }
    }

    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Decode and process one delivery, returning how to settle it.
    ///
    /// `redelivered` is the broker's flag: a message that already came back
    /// once is dropped instead of requeued when it fails again.
    pub async fn route(
        &self,
        headers: Option<&EventHeaders>,
        body: &[u8],
        redelivered: bool,
    ) -> Disposition {
        let Some(headers) = headers else {
            warn!(listener = %self.listener, "Skip message without event headers");
            return Disposition::Ack;
        };

        let Some(handler) = self.handlers.get(&headers.event_type) else {
            info!(
                listener = %self.listener,
                domain = %headers.domain,
                event_type = %headers.event_type,
                "Skip message"
            );
            return Disposition::Ack;
        };

        let event = match handler.decode(body) {
            Ok(event) => event,
            Err(error) => {
                warn!(
                    listener = %self.listener,
                    event_type = %headers.event_type,
                    error = %error,
                    "Could not decode message"
                );
                handler.on_error(&Event::raw(headers.definition(), body), &error);
                return self.on_failure(&error, redelivered);
            }
        };

        match handler.process(&event).await {
            Ok(()) => {
                debug!(listener = %self.listener, event_key = %event.key(), "Processed message");
                Disposition::Ack
            }
            Err(error) => {
                warn!(
                    listener = %self.listener,
                    domain = %headers.domain,
                    event_type = %headers.event_type,
                    error = %error,
                    "Could not process message"
                );
                handler.on_error(&event, &error);
                self.on_failure(&error, redelivered)
            }
        }
    }

    fn on_failure(&self, error: &HandlerError, redelivered: bool) -> Disposition {
        match self.policy {
            AckPolicy::Always => Disposition::Ack,
            AckPolicy::OnSuccess if error.is_permanent() || redelivered => {
                warn!(listener = %self.listener, redelivered, "Dropping failed message");
                Disposition::Discard
            }
            AckPolicy::OnSuccess => Disposition::Requeue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactbus_core::{DomainEvent, TypedHandler};
    use serde::{Deserialize, Serialize};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct UserDeleted {
        user_id: String,
    }

    impl DomainEvent for UserDeleted {
        const DOMAIN: &'static str = "user";
        const NAME: &'static str = "UserDeleted";

        fn entity_id(&self) -> String {
            self.user_id.clone()
        }
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn handler(seen: Log, errors: Log, fail: bool) -> Arc<dyn EventHandler> {
        TypedHandler::new("projection", move |event: UserDeleted| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(event.user_id.clone());
                if fail {
                    Err(HandlerError::NotFound(event.user_id))
                } else {
                    Ok(())
                }
            }
        })
        .with_error_handler(move |_event, error| errors.lock().unwrap().push(error.to_string()))
        .into_arc()
    }

    fn headers() -> EventHeaders {
        EventHeaders::from_definition(&UserDeleted::definition())
    }

    fn router(policy: AckPolicy, fail: bool) -> (DeliveryRouter, Log, Log) {
        let seen = Log::default();
        let errors = Log::default();
        let router = DeliveryRouter::new(
            "projection",
            &[handler(Arc::clone(&seen), Arc::clone(&errors), fail)],
            policy,
        );
        (router, seen, errors)
    }

    #[tokio::test]
    async fn decodes_and_processes_matching_message() {
        let (router, seen, errors) = router(AckPolicy::Always, false);

        let disposition = router
            .route(Some(&headers()), br#"{"user_id":"user1"}"#, false)
            .await;

        assert_eq!(disposition, Disposition::Ack);
        assert_eq!(*seen.lock().unwrap(), vec!["user1".to_string()]);
        assert!(errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_event_type_is_skipped_and_acked() {
        let (router, seen, _) = router(AckPolicy::OnSuccess, false);
        let other = EventHeaders {
            domain: "user".to_string(),
            event_type: "NewUserRegistered".to_string(),
        };

        assert!(!router.handles("NewUserRegistered"));
        assert_eq!(router.route(Some(&other), b"{}", false).await, Disposition::Ack);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_headers_are_skipped_and_acked() {
        let (router, seen, _) = router(AckPolicy::OnSuccess, false);
        assert_eq!(router.route(None, b"{}", false).await, Disposition::Ack);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn decode_failure_reports_without_processing() {
        let (router, seen, errors) = router(AckPolicy::Always, false);

        let disposition = router.route(Some(&headers()), b"not json", false).await;

        assert_eq!(disposition, Disposition::Ack);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(errors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn processing_failure_is_acked_under_always() {
        let (router, _, errors) = router(AckPolicy::Always, true);

        let disposition = router
            .route(Some(&headers()), br#"{"user_id":"user1"}"#, false)
            .await;

        assert_eq!(disposition, Disposition::Ack);
        assert_eq!(*errors.lock().unwrap(), vec!["Not found: user1".to_string()]);
    }

    #[tokio::test]
    async fn processing_failure_is_requeued_under_on_success() {
        let (router, _, _) = router(AckPolicy::OnSuccess, true);
        let disposition = router
            .route(Some(&headers()), br#"{"user_id":"user1"}"#, false)
            .await;
        assert_eq!(disposition, Disposition::Requeue);
    }

    #[tokio::test]
    async fn poison_body_is_discarded_under_on_success() {
        let (router, _, _) = router(AckPolicy::OnSuccess, false);
        let disposition = router.route(Some(&headers()), b"not json", false).await;
        assert_eq!(disposition, Disposition::Discard);
    }

    #[tokio::test]
    async fn failing_redelivery_is_discarded_under_on_success() {
        let (router, seen, errors) = router(AckPolicy::OnSuccess, true);
        let body = br#"{"user_id":"ghost"}"#;

        let first = router.route(Some(&headers()), body, false).await;
        let second = router.route(Some(&headers()), body, true).await;

        assert_eq!(first, Disposition::Requeue);
        assert_eq!(second, Disposition::Discard);
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(errors.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn redelivered_success_is_acked() {
        let (router, _, _) = router(AckPolicy::OnSuccess, false);
        let disposition = router
            .route(Some(&headers()), br#"{"user_id":"user1"}"#, true)
            .await;
        assert_eq!(disposition, Disposition::Ack);
    }

    #[tokio::test]
    async fn published_body_round_trips_through_headers() {
        let deleted = UserDeleted {
            user_id: "user7".to_string(),
        };
        let published = Event::from_domain(deleted.clone());
        let body = published.to_json().unwrap();
        let table = EventHeaders::from_definition(published.definition()).to_table();

        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        let handler = TypedHandler::new("projection", move |event: UserDeleted| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(event);
                Ok(())
            }
        })
        .into_arc();
        let router = DeliveryRouter::new(
            "projection",
            &[Arc::clone(&handler)],
            AckPolicy::OnSuccess,
        );

        let headers = EventHeaders::from_table(&table);
        let disposition = router.route(headers.as_ref(), &body, false).await;

        assert_eq!(disposition, Disposition::Ack);
        assert_eq!(*captured.lock().unwrap(), vec![deleted.clone()]);

        let decoded = handler.decode(&body).unwrap();
        assert_eq!(decoded.payload_as::<UserDeleted>(), Some(&deleted));
        assert_eq!(decoded.entity_id(), published.entity_id());
        assert_eq!(decoded.definition(), published.definition());
    }
}
