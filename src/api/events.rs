//! Live run events
//!
//! GET /api/v1/events?room_id=&user_id= - Server-sent events until disconnect
//!
//! Subscriptions are scoped to the caller's organization. Each subscriber has a bounded queue; events that do not fit are dropped.
//! The subscription is removed from the bus when the stream is dropped.

use super::caller::CallerIdentity;
use super::error::ApiError;
use super::AppState;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use tandem_core::{EventFilter, RoomEvent, Subscription};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

fn to_sse(event: &RoomEvent) -> Event {
    match Event::default().event(event.kind()).json_data(event) {
        Ok(sse) => sse,
        Err(e) => {
            warn!(error = %e, "Failed to serialize event");
            Event::default().comment("unserializable event")
        }
    }
}

/// Stream of events for one subscription, ending on shutdown
pub fn event_stream(
    subscription: Subscription,
    shutdown: CancellationToken,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold((subscription, shutdown), |(mut subscription, shutdown)| async move {
        tokio::select! {
            event = subscription.recv() => {
                let event = event?;
                Some((Ok(to_sse(&event)), (subscription, shutdown)))
            }
            _ = shutdown.cancelled() => None,
        }
    })
}

async fn subscribe(
    CallerIdentity(caller): CallerIdentity,
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let subscription = state.orchestrator.subscribe_events(&caller, filter).await?;
    debug!(subscriber = subscription.id(), org = caller.org(), "Event stream opened");

    Ok(Sse::new(event_stream(subscription, state.shutdown.clone()))
        .keep_alive(KeepAlive::new().interval(state.keep_alive)))
}

/// Events routes
pub fn events_routes() -> Router<AppState> {
    Router::new().route("/api/v1/events", get(subscribe))
}
