use axum::{
    extract::State,
    response::{
        Sse,
        sse::{Event as SseEvent, KeepAlive},
    },
};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;

use crate::common::AppState;
use crate::events::DashboardEvent;

fn to_sse(event: &DashboardEvent) -> Option<SseEvent> {
    let data = serde_json::to_string(event).ok()?;
    Some(SseEvent::default().event(event.name()).data(data))
}

/// Live dashboard stream (Server-Sent Events)
///
/// A new viewer first receives one `chart_frame` per channel with samples,
/// so charts are populated before live data arrives, then the live
/// `chart_frame`, `sensor_data` and `seismic_alert` events.
#[utoipa::path(
    get,
    path = "/api/stream",
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream"),
    ),
    tag = "stream"
)]
pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    // Subscribe before taking the snapshot so no append falls in between
    let rx = state.events.subscribe();

    let snapshot_events: Vec<Result<SseEvent, Infallible>> = {
        let windows = state.windows.lock();
        state
            .catalog
            .iter()
            .filter_map(|c| windows.snapshot(c.key))
            .filter_map(|snapshot| to_sse(&DashboardEvent::ChartFrame(snapshot)))
            .map(Ok)
            .collect()
    };

    tracing::debug!(frames = snapshot_events.len(), "Viewer connected, sending snapshot");

    let live_events = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => to_sse(&event).map(Ok),
            // Lagged viewers skip what they missed
            Err(_) => None,
        }
    });

    Sse::new(stream::iter(snapshot_events).chain(live_events)).keep_alive(KeepAlive::default())
}
