//! Prints captured events as JSON lines on stdout.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use pactbus_core::{BusConfig, Event, EventDefinition, EventSniffer};

use crate::bus::{build_event_bus, shutdown_signal};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Args)]
pub struct SniffArgs {
    /// Event domain, e.g. `user`
    #[arg(long)]
    pub domain: String,

    /// Event name, e.g. `NewUserRegistered`
    #[arg(long)]
    pub name: String,
}

pub async fn run(args: SniffArgs, config: &BusConfig) -> Result<()> {
    let bus = build_event_bus(config).await?;
    let sniffer = EventSniffer::new(bus.clone());
    let definition = EventDefinition::new(args.domain, args.name);

    let mut listening = {
        let sniffer = sniffer.clone();
        tokio::spawn(async move { sniffer.listen([definition]).await })
    };
    let mut registered = false;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let outcome = loop {
        tokio::select! {
            result = &mut listening, if !registered => {
                // In-memory listen returns right away; a broker listen only
                // returns when consuming stops.
                match result.context("Sniffer task panicked")? {
                    Ok(()) => registered = true,
                    Err(e) => break Err(e).context("Sniffer stopped listening"),
                }
            }
            events = sniffer.wait_for(1, POLL_INTERVAL) => {
                if !events.is_empty() {
                    print_events(&sniffer.take_events().await)?;
                }
            }
            () = &mut shutdown => break Ok(()),
        }
    };

    bus.close().await?;
    outcome
}

fn print_events(events: &[Event]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    for event in events {
        writeln!(stdout, "{}", event_line(event)?)?;
    }
    stdout.flush()?;
    Ok(())
}

fn event_line(event: &Event) -> Result<String> {
    let payload: serde_json::Value = serde_json::from_slice(&event.to_json()?)
        .context("Captured payload is not JSON")?;
    let mut line = json!({
        "domain": event.definition().domain(),
        "name": event.definition().name(),
        "payload": payload,
    });
    // Broker deliveries carry no entity id.
    if !event.entity_id().is_empty() {
        line["entity_id"] = json!(event.entity_id());
    }
    Ok(line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_line_carries_definition_and_payload() {
        let event = Event::new(
            EventDefinition::new("user", "UserDeleted"),
            "user1",
            json!({ "user_id": "user1" }),
        );

        let line: serde_json::Value = serde_json::from_str(&event_line(&event).unwrap()).unwrap();

        assert_eq!(
            line,
            json!({
                "domain": "user",
                "name": "UserDeleted",
                "entity_id": "user1",
                "payload": { "user_id": "user1" }
            })
        );
    }

    #[test]
    fn event_line_omits_unknown_entity_id() {
        let event = Event::new(
            EventDefinition::new("user", "UserDeleted"),
            "",
            json!({ "user_id": "user1" }),
        );

        let line: serde_json::Value = serde_json::from_str(&event_line(&event).unwrap()).unwrap();

        assert!(line.get("entity_id").is_none());
        assert_eq!(line["payload"], json!({ "user_id": "user1" }));
    }
}
