// Bridges workflow events onto the broadcast hub in the configured wire mode.

use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{EventPublisher, EventScope, FragmentRenderer, RoomEvent};
use crate::use_cases::{BroadcastHub, HubEvent, Payload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastMode {
    // Pre-rendered fragments for htmx pages.
    Markup,
    // `{"target","swap","data"}` envelopes for script clients.
    Json,
}

impl BroadcastMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "markup" | "html" => Some(BroadcastMode::Markup),
            "json" => Some(BroadcastMode::Json),
            _ => None,
        }
    }
}

pub struct HubPublisher {
    hub: BroadcastHub,
    mode: BroadcastMode,
    renderer: Arc<dyn FragmentRenderer>,
}

impl HubPublisher {
    pub fn new(hub: BroadcastHub, mode: BroadcastMode, renderer: Arc<dyn FragmentRenderer>) -> Self {
        Self {
            hub,
            mode,
            renderer,
        }
    }

    /// Encodes once per publish; every subscriber shares the result.
    pub fn encode(&self, event: &RoomEvent) -> HubEvent {
        match self.mode {
            BroadcastMode::Json => structured(event),
            BroadcastMode::Markup => match self.renderer.render(event) {
                Ok(markup) => HubEvent {
                    event_type: event.event_type(),
                    target: event.target(),
                    swap: event.swap(),
                    payload: Payload::Markup(markup),
                },
                Err(err) => {
                    warn!(
                        event_type = event.event_type(),
                        template = err.template,
                        reason = %err.reason,
                        "fragment render failed; sending structured payload"
                    );
                    structured(event)
                }
            },
        }
    }
}

fn structured(event: &RoomEvent) -> HubEvent {
    let data = event.to_json().unwrap_or_else(|err| {
        warn!(event_type = event.event_type(), error = %err, "event data did not serialize");
        Value::Null
    });
    HubEvent {
        event_type: event.event_type(),
        target: event.target(),
        swap: event.swap(),
        payload: Payload::Structured(json!({
            "target": event.target(),
            "swap": event.swap().map(|swap| swap.as_str()),
            "data": data,
        })),
    }
}

impl EventPublisher for HubPublisher {
    fn publish(&self, scope: EventScope, event: RoomEvent) {
        let encoded = self.encode(&event);
        let delivered = match scope {
            EventScope::User(user_id) => self.hub.broadcast_to_user(user_id, encoded),
            EventScope::Room(_) => self.hub.broadcast(scope, encoded),
        };
        debug!(%scope, event_type = event.event_type(), delivered, "published");
    }
}
