use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use crate::errors::AppError;
use crate::state::AppState;

use super::check_auth;

const KEEPALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_millis(5000);

#[derive(Deserialize)]
pub struct StreamQuery {
    pub token: Option<String>,
}

// GET /api/bookings/stream
pub async fn booking_changes(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // EventSource can't set headers, so the token may come as a query param.
    let query_ok = query.token.as_deref() == Some(state.config.api_token.as_str())
        && !state.config.api_token.is_empty();
    if !query_ok {
        check_auth(&headers, &state.config.api_token)?;
    }

    let rx = state.changes.subscribe();
    tracing::info!(subscribers = state.changes.subscriber_count(), "change feed client connected");

    let hello = tokio_stream::once(Ok::<_, Infallible>(
        Event::default().retry(RECONNECT_DELAY).comment("connected"),
    ));

    let live = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => match Event::default().json_data(&event) {
            Ok(frame) => Some(Ok(frame)),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode booking change");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "change feed subscriber lagged");
            None
        }
    });

    let keepalive = IntervalStream::new(tokio::time::interval(KEEPALIVE))
        .map(|_| Ok(Event::default().comment("keepalive")));

    Ok(Sse::new(hello.chain(live).merge(keepalive)))
}
