// Realtime broadcast hub: routes encoded events to live stream subscriptions.

use crate::domain::{EventScope, SwapHint, UserId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

pub type SubscriptionId = u64;

/// Event body as delivered to a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Structured(serde_json::Value),
    Markup(String),
}

impl Payload {
    /// Text placed on the `data:` line of a frame.
    pub fn to_data(&self) -> String {
        match self {
            Payload::Structured(value) => value.to_string(),
            Payload::Markup(markup) => markup.clone(),
        }
    }
}

/// An event ready for the wire. Immutable once built; shared by every
/// subscriber it is delivered to.
#[derive(Debug, Clone, PartialEq)]
pub struct HubEvent {
    pub event_type: &'static str,
    pub target: Option<&'static str>,
    pub swap: Option<SwapHint>,
    pub payload: Payload,
}

impl HubEvent {
    pub fn structured(event_type: &'static str, value: serde_json::Value) -> Self {
        Self {
            event_type,
            target: None,
            swap: None,
            payload: Payload::Structured(value),
        }
    }
}

struct Subscriber {
    user_id: UserId,
    tx: mpsc::Sender<Arc<HubEvent>>,
}

#[derive(Default)]
struct Registry {
    scopes: HashMap<EventScope, HashMap<SubscriptionId, Subscriber>>,
    // Reverse index so unsubscribe needs only the id.
    index: HashMap<SubscriptionId, EventScope>,
}

impl Registry {
    fn remove(&mut self, id: SubscriptionId) -> Option<Subscriber> {
        let scope = self.index.remove(&id)?;
        let subscribers = self.scopes.get_mut(&scope)?;
        let removed = subscribers.remove(&id);
        if subscribers.is_empty() {
            self.scopes.remove(&scope);
        }
        removed
    }
}

/// Owns every live subscription. Cheap to clone; clones share one registry,
/// while separately constructed hubs are fully independent.
#[derive(Clone)]
pub struct BroadcastHub {
    registry: Arc<RwLock<Registry>>,
    next_id: Arc<AtomicU64>,
    buffer: usize,
}

impl BroadcastHub {
    /// `buffer` is the per-subscriber queue length; events beyond it are
    /// dropped for that subscriber only.
    pub fn new(buffer: usize) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            next_id: Arc::new(AtomicU64::new(1)),
            buffer: buffer.max(1),
        }
    }

    /// Registers a new channel under `scope`. Never blocks on delivery.
    pub fn subscribe(&self, scope: EventScope, user_id: UserId) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);

        {
            let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
            registry
                .scopes
                .entry(scope)
                .or_default()
                .insert(id, Subscriber { user_id, tx });
            registry.index.insert(id, scope);
        }
        debug!(subscription_id = id, %scope, %user_id, "subscribed");

        Subscription {
            id,
            scope,
            user_id,
            rx,
            hub: self.clone(),
        }
    }

    /// Removes and closes a subscription. Returns false when it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = {
            let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
            registry.remove(id)
        };
        match removed {
            Some(subscriber) => {
                debug!(subscription_id = id, user_id = %subscriber.user_id, "unsubscribed");
                true
            }
            None => false,
        }
    }

    /// Delivers `event` to every live subscription under `scope` and returns
    /// how many accepted it. Full queues drop the event; closed ones are pruned.
    pub fn broadcast(&self, scope: EventScope, event: HubEvent) -> usize {
        let event = Arc::new(event);
        let mut delivered = 0;
        let mut closed = Vec::new();

        {
            let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
            let Some(subscribers) = registry.scopes.get(&scope) else {
                return 0;
            };
            for (id, subscriber) in subscribers {
                match subscriber.tx.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(
                            subscription_id = id,
                            user_id = %subscriber.user_id,
                            event_type = event.event_type,
                            "subscriber queue full; dropping event"
                        );
                    }
                    Err(TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        if !closed.is_empty() {
            let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
            for id in closed {
                registry.remove(id);
            }
        }

        debug!(%scope, event_type = event.event_type, delivered, "broadcast");
        delivered
    }

    /// Delivers to the personal streams of `user_id`, whatever room they view.
    pub fn broadcast_to_user(&self, user_id: UserId, event: HubEvent) -> usize {
        self.broadcast(EventScope::User(user_id), event)
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self, scope: EventScope) -> usize {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        registry.scopes.get(&scope).map_or(0, HashMap::len)
    }

    /// Drops every channel so open streams end. Used on shutdown.
    pub fn close_all(&self) {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        let count = registry.index.len();
        registry.scopes.clear();
        registry.index.clear();
        debug!(count, "closed all subscriptions");
    }
}

/// One live connection's registration. Dropping it unsubscribes, so a
/// stream that ends for any reason cleans up exactly once.
pub struct Subscription {
    id: SubscriptionId,
    scope: EventScope,
    user_id: UserId,
    rx: mpsc::Receiver<Arc<HubEvent>>,
    hub: BroadcastHub,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn scope(&self) -> EventScope {
        self.scope
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Next event, or None once the hub has closed this channel.
    pub async fn recv(&mut self) -> Option<Arc<HubEvent>> {
        self.rx.recv().await
    }

    #[cfg(test)]
    pub(crate) fn try_recv(&mut self) -> Option<Arc<HubEvent>> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}
