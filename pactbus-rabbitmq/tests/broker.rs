//! Integration tests requiring a running RabbitMQ broker.
//!
//! Run with: cargo test -p pactbus-rabbitmq --test broker -- --ignored
//!
//! The broker URL comes from `RABBITMQ_URL`, falling back to the local
//! default. Queue and exchange names are suffixed per run so reruns do not
//! see leftovers from earlier ones.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use pactbus_core::{
    BusConfig, DomainEvent, Event, EventBus, EventDefinition, EventHandler, EventSniffer,
    HandlerError, TypedHandler,
};
use pactbus_rabbitmq::RabbitMqEventBus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Pinged {
    id: String,
}

impl DomainEvent for Pinged {
    const DOMAIN: &'static str = "pactbus-test";
    const NAME: &'static str = "Pinged";

    fn entity_id(&self) -> String {
        self.id.clone()
    }
}

fn run_suffix() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{nanos:x}")
}

async fn connect() -> Arc<RabbitMqEventBus> {
    let config = BusConfig::load(None).expect("Failed to load config");
    Arc::new(
        RabbitMqEventBus::connect(config.rabbitmq)
            .await
            .expect("Failed to connect to RabbitMQ"),
    )
}

fn recorder(listener: &str, seen: Arc<Mutex<Vec<String>>>) -> Arc<dyn EventHandler> {
    TypedHandler::new(listener, move |event: Pinged| {
        let seen = Arc::clone(&seen);
        async move {
            seen.lock().unwrap().push(event.id);
            Ok(())
        }
    })
    .into_arc()
}

async fn wait_until(deadline: Duration, done: impl Fn() -> bool) {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
#[ignore]
async fn test_publish_reaches_listener() {
    let bus = connect().await;
    let listener = format!("pactbus-test-{}", run_suffix());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let consumer = {
        let bus = Arc::clone(&bus);
        let handlers = vec![recorder(&listener, Arc::clone(&seen))];
        let listener = listener.clone();
        tokio::spawn(async move { bus.listen(&listener, handlers).await })
    };
    tokio::time::sleep(Duration::from_millis(500)).await;

    bus.publish(Event::from_domain(Pinged {
        id: "p1".to_string(),
    }))
    .await
    .unwrap();

    wait_until(Duration::from_secs(5), || !seen.lock().unwrap().is_empty()).await;
    assert_eq!(*seen.lock().unwrap(), vec!["p1".to_string()]);

    bus.close().await.unwrap();
    let result = consumer.await.unwrap();
    assert!(result.is_err());
}

#[tokio::test]
#[ignore]
async fn test_replicas_share_one_queue() {
    let bus = connect().await;
    let listener = format!("pactbus-test-{}", run_suffix());
    let count = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let bus = Arc::clone(&bus);
        let count = Arc::clone(&count);
        let listener = listener.clone();
        let handler = TypedHandler::new(listener.clone(), move |_event: Pinged| {
            let count = Arc::clone(&count);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok::<(), HandlerError>(())
            }
        })
        .into_arc();
        tokio::spawn(async move { bus.listen(&listener, vec![handler]).await });
    }
    tokio::time::sleep(Duration::from_millis(500)).await;

    for i in 0..10 {
        bus.publish(Event::from_domain(Pinged { id: format!("p{i}") }))
            .await
            .unwrap();
    }

    wait_until(Duration::from_secs(5), || count.load(Ordering::SeqCst) >= 10).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(count.load(Ordering::SeqCst), 10);

    bus.close().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_sniffer_over_broker() {
    let bus = connect().await;
    let sniffer = EventSniffer::new(Arc::clone(&bus) as Arc<dyn EventBus>);

    {
        let sniffer = sniffer.clone();
        tokio::spawn(async move { sniffer.listen([Pinged::definition()]).await });
    }
    tokio::time::sleep(Duration::from_millis(500)).await;
    sniffer.clear().await;

    let id = run_suffix();
    bus.publish(Event::from_domain(Pinged { id: id.clone() }))
        .await
        .unwrap();

    let events = sniffer.wait_for(1, Duration::from_secs(5)).await;
    assert!(
        events
            .iter()
            .any(|e| e.definition() == &EventDefinition::new("pactbus-test", "Pinged")
                && e.decode::<Pinged>().map(|p| p.id == id).unwrap_or(false))
    );

    bus.close().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_close_is_idempotent() {
    let bus = connect().await;
    bus.close().await.unwrap();
    bus.close().await.unwrap();

    let error = bus
        .publish(Event::from_domain(Pinged {
            id: "late".to_string(),
        }))
        .await
        .unwrap_err();
    assert!(error.to_string().contains("closed"));
}
