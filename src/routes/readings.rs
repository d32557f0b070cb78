use axum::{Json, body::Bytes, extract::State, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::feed::{FeedMessage, ingest_message};

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    /// False when the reading was dropped (unknown channel or topic, non-numeric payload)
    pub accepted: bool,
}

/// Ingest a single reading
///
/// Accepts either a sensor event `{sensor_id, value, timestamp}` or a raw
/// broker message `{topic, payload}`. Readings for unknown channels are
/// accepted at the HTTP level but dropped.
#[utoipa::path(
    post,
    path = "/api/readings",
    request_body = FeedMessage,
    responses(
        (status = 202, description = "Reading processed", body = IngestResponse),
        (status = 400, description = "Body is not a feed message"),
    ),
    tag = "feed"
)]
pub async fn post_reading(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<IngestResponse>)> {
    let message = FeedMessage::decode(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid feed message: {e}")))?;

    let accepted = ingest_message(&state, message);

    Ok((StatusCode::ACCEPTED, Json(IngestResponse { accepted })))
}
