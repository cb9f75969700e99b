use crate::params::log_record::IndexParams;
use crate::sse::sink::ChannelSink;
use async_stream::stream;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use broadcast::delivery;
use futures::Stream;
use log::*;
use service::AppState;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;

/// GET a live stream of log records as Server-Sent Events
#[utoipa::path(
    get,
    path = "/api/logs/stream",
    params(IndexParams),
    responses(
        (status = 200, description = "Stream of `data: <json log record>` events, one per new matching record", content_type = "text/event-stream", body = String)
    )
)]
pub async fn stream_handler(
    State(app_state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = app_state.hub.register(params.into_filter());
    let subscriber_id = subscription.id();
    debug!("Establishing SSE stream for subscriber {subscriber_id}");

    let (tx, mut rx) = mpsc::channel(1);

    // Cancelled by server shutdown, or by the response body being dropped
    // when the client disconnects.
    let cancel = app_state.shutdown.child_token();
    tokio::spawn(delivery::run(
        Arc::clone(&app_state.hub),
        subscription,
        ChannelSink::new(tx),
        cancel.clone(),
    ));
    let disconnect_guard = cancel.drop_guard();

    let stream = stream! {
        let _disconnect_guard = disconnect_guard;

        while let Some(event) = rx.recv().await {
            yield Ok::<_, Infallible>(event);
        }

        debug!("SSE stream for subscriber {subscriber_id} closed");
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
