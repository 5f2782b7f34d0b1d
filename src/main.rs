use std::cell::Cell;
use std::rc::Rc;

use anyhow::{Context, Result};
use eventkit::{Dispatch, EventBus, EventsConfig, Listener};
use serde_json::Value as JsonValue;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Parses `type` or `type=<json>`. Payloads that are not valid JSON are sent as strings.
fn parse_trigger(raw: &str) -> (String, Option<JsonValue>) {
    match raw.split_once('=') {
        Some((event_type, payload)) => {
            let data = serde_json::from_str(payload)
                .unwrap_or_else(|_| JsonValue::String(payload.to_string()));
            (event_type.to_string(), Some(data))
        }
        None => (raw.to_string(), None),
    }
}

#[derive(Debug, Default, PartialEq)]
struct Totals {
    delivered: usize,
    first_deliveries: usize,
}

/// Subscribes a tracing listener and a one-shot listener per type, then fires every trigger.
fn deliver(bus: &EventBus, triggers: Vec<(String, Option<JsonValue>)>) -> Totals {
    let delivered = Rc::new(Cell::new(0usize));
    let first_deliveries = Rc::new(Cell::new(0usize));

    let counter = Rc::clone(&delivered);
    let trace_listener = Listener::new(move |event| {
        counter.set(counter.get() + 1);
        info!(
            event_type = event.event_type(),
            data = ?event.data(),
            "event delivered"
        );
    });
    let first_counter = Rc::clone(&first_deliveries);
    let first_only = Listener::new(move |event| {
        first_counter.set(first_counter.get() + 1);
        info!(event_type = event.event_type(), "first delivery of this type");
    });

    for (event_type, _) in &triggers {
        bus.on(event_type, &trace_listener)
            .once(event_type, &first_only);
    }

    for (event_type, data) in triggers {
        if !bus.trigger(&event_type, data) {
            warn!(event_type = %event_type, "no listeners notified");
        }
    }

    Totals {
        delivered: delivered.get(),
        first_deliveries: first_deliveries.get(),
    }
}

fn main() -> Result<()> {
    let subscriber_result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();
    if subscriber_result.is_err() {
        // tracing was already initialised; continue silently
    }

    let config = EventsConfig::load(EventsConfig::default_path())
        .context("failed to load events configuration")?;
    info!(
        touch_aliasing = ?config.touch_aliasing,
        id_attribute = %config.id_attribute,
        "configuration loaded"
    );

    let mut triggers: Vec<(String, Option<JsonValue>)> =
        std::env::args().skip(1).map(|raw| parse_trigger(&raw)).collect();
    if triggers.is_empty() {
        triggers.push(("ready".to_string(), None));
    }

    let bus = EventBus::new();
    let totals = deliver(&bus, triggers);
    info!(
        delivered = totals.delivered,
        first_deliveries = totals.first_deliveries,
        listeners = bus.listeners().total_listener_count(),
        "done"
    );
    bus.off_all();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bare_type() {
        assert_eq!(parse_trigger("ready"), ("ready".to_string(), None));
    }

    #[test]
    fn parses_json_payload() {
        assert_eq!(
            parse_trigger("update={\"n\":1}"),
            ("update".to_string(), Some(json!({ "n": 1 })))
        );
    }

    #[test]
    fn falls_back_to_string_payload() {
        assert_eq!(
            parse_trigger("hey=ho"),
            ("hey".to_string(), Some(json!("ho")))
        );
    }

    #[test]
    fn repeated_type_fires_first_only_once() {
        let bus = EventBus::new();
        let totals = deliver(
            &bus,
            vec![
                parse_trigger("ready"),
                parse_trigger("ready=1"),
                parse_trigger("done"),
            ],
        );
        assert_eq!(
            totals,
            Totals {
                delivered: 3,
                first_deliveries: 2,
            }
        );
        assert_eq!(bus.listeners().listener_count("ready"), 1);
    }
}
