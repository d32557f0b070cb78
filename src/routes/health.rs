use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::common::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Channels holding at least one sample
    pub live_channels: usize,
    /// Connected dashboard viewers
    pub viewers: usize,
    pub station_configured: bool,
}

/// Health check endpoint
///
/// Returns 200 OK while the service is running, with a summary of the live
/// state. Not rate-limited; suitable for container probes.
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "health"
)]
pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let live_channels = {
        let windows = state.windows.lock();
        state
            .catalog
            .iter()
            .filter(|c| windows.has_buffer(c.key))
            .count()
    };

    Json(HealthResponse {
        status: "ok",
        live_channels,
        viewers: state.events.viewer_count(),
        station_configured: state.station_client.is_configured(),
    })
}
