//! SSE endpoint streaming per-session progress events.
//!
//! Subscribes to a StreamHub session and forwards events as SSE messages.
//! A periodic keep-alive comment holds idle connections open.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use super::stream_hub::StreamHub;

/// SSE handler — subscribes to a progress session and streams its events.
pub async fn stream_handler(
    State(hub): State<StreamHub>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let rx = hub.subscribe(&session_id).await;

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(value) => {
            let event_type = value
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or("message");

            Some(Ok::<_, Infallible>(
                Event::default().event(event_type).data(value.to_string()),
            ))
        }
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(_)) => {
            Some(Ok(Event::default().event("lagged").data("{}")))
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
