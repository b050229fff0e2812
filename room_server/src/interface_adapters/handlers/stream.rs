// Server-sent event streams: one hub subscription per open connection.

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
};
use futures_util::{Stream, StreamExt};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::{Instant, interval_at};
use tracing::{info, info_span};

use crate::domain::EventScope;
use crate::interface_adapters::handlers::rooms::parse_room_id;
use crate::interface_adapters::http::{ActingUser, ApiError, map_game_error};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{HubEvent, Subscription, SubscriptionId};

/// Events for everyone watching one room.
pub async fn room_events(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(room_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let room_id = parse_room_id(&room_id)?;
    // Refuse to hold a connection open for a room that does not exist.
    state.rooms.room(room_id).await.map_err(map_game_error)?;

    let subscription = state.hub.subscribe(EventScope::Room(room_id), user.0);
    Ok(event_stream(subscription, state.keepalive))
}

/// Personal events for the acting user, whichever page they are on.
pub async fn user_events(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.hub.subscribe(EventScope::User(user.0), user.0);
    event_stream(subscription, state.keepalive)
}

/// One unit written to an open stream.
#[derive(Debug)]
enum StreamFrame {
    Connected(SubscriptionId),
    Hub(Arc<HubEvent>),
    Ping(u64),
}

impl StreamFrame {
    fn into_event(self) -> Event {
        match self {
            StreamFrame::Connected(id) => Event::default()
                .event("connected")
                .data(json!({ "subscription_id": id }).to_string()),
            StreamFrame::Hub(event) => Event::default()
                .event(event.event_type)
                .data(event.payload.to_data()),
            StreamFrame::Ping(at) => Event::default().event("ping").data(at.to_string()),
        }
    }
}

fn event_stream(
    subscription: Subscription,
    keepalive: Duration,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(frames(subscription, keepalive).map(|frame| Ok(frame.into_event())))
}

// `connected` first, then hub events interleaved with pings until the hub
// closes the channel. Dropping the stream drops the subscription, which
// unsubscribes on client disconnect.
fn frames(mut subscription: Subscription, keepalive: Duration) -> impl Stream<Item = StreamFrame> {
    // Subscription ids are process-unique, so they double as connection ids.
    let span = info_span!(
        "stream",
        subscription_id = subscription.id(),
        scope = %subscription.scope(),
        user_id = %subscription.user_id()
    );

    async_stream::stream! {
        info!(parent: &span, "stream opened");
        yield StreamFrame::Connected(subscription.id());

        let mut ping = interval_at(Instant::now() + keepalive, keepalive);
        loop {
            tokio::select! {
                received = subscription.recv() => {
                    match received {
                        Some(event) => yield StreamFrame::Hub(event),
                        None => break,
                    }
                }
                _ = ping.tick() => {
                    yield StreamFrame::Ping(now_epoch_seconds());
                }
            }
        }
        info!(parent: &span, "stream closed by hub");
    }
}

fn now_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
