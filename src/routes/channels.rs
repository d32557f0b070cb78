use axum::{
    Json,
    extract::{Path, Query, State},
    http::{
        HeaderValue,
        header::{self, HeaderMap},
    },
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::channels::RefreshClass;
use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::window::{Sample, WindowSnapshot};

fn default_format() -> String {
    "json".to_string()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChannelResponse {
    pub key: String,
    pub label: String,
    pub unit: String,
    pub axis_min: f64,
    pub axis_max: f64,
    pub color: String,
    pub topic: String,
    pub refresh: RefreshClass,
    /// Samples currently in the window
    pub samples: usize,
    /// Axis range of the window (null while empty)
    pub window_start: Option<i64>,
    pub window_end: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct WindowQuery {
    /// Response format: json (default), csv
    #[serde(default = "default_format")]
    pub format: String,
}

fn determine_format(query_format: &str, headers: &HeaderMap) -> String {
    // Query parameter takes precedence
    if query_format != "json" {
        return query_format.to_lowercase();
    }

    if let Some(accept) = headers.get(header::ACCEPT)
        && let Ok(accept_str) = accept.to_str()
        && accept_str.contains("text/csv")
    {
        return "csv".to_string();
    }

    "json".to_string()
}

fn build_csv_response(samples: &[Sample]) -> AppResult<Response> {
    let mut writer = csv::Writer::from_writer(Vec::with_capacity(samples.len() * 24));
    writer
        .write_record(["timestamp", "value"])
        .map_err(|e| AppError::Internal(e.to_string()))?;
    for sample in samples {
        writer
            .write_record([sample.timestamp.to_string(), sample.value.to_string()])
            .map_err(|e| AppError::Internal(e.to_string()))?;
    }
    let body = writer
        .into_inner()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Response::builder()
        .header(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"))
        .body(axum::body::Body::from(body))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// List the dashboard channels
///
/// Returns chart metadata for every known channel along with the current
/// fill of its window.
#[utoipa::path(
    get,
    path = "/api/channels",
    responses(
        (status = 200, description = "Channels retrieved successfully", body = Vec<ChannelResponse>),
    ),
    tag = "channels"
)]
pub async fn list_channels(State(state): State<AppState>) -> Json<Vec<ChannelResponse>> {
    let windows = state.windows.lock();

    let response: Vec<ChannelResponse> = state
        .catalog
        .iter()
        .map(|c| {
            let bounds = windows.window_bounds(c.key);
            ChannelResponse {
                key: c.key.to_string(),
                label: c.label.to_string(),
                unit: c.unit.to_string(),
                axis_min: c.axis_min,
                axis_max: c.axis_max,
                color: c.color.to_string(),
                topic: c.topic.to_string(),
                refresh: c.refresh,
                samples: windows.samples(c.key).len(),
                window_start: bounds.map(|(start, _)| start),
                window_end: bounds.map(|(_, end)| end),
            }
        })
        .collect();

    Json(response)
}

/// Get the live window of a channel
///
/// Returns the samples currently charted for the channel with the axis range.
/// Supports JSON and CSV formats.
#[utoipa::path(
    get,
    path = "/api/channels/{channel}/window",
    params(
        ("channel" = String, Path, description = "Channel key, e.g. tempChart"),
        WindowQuery
    ),
    responses(
        (status = 200, description = "Window retrieved successfully", body = WindowSnapshot),
        (status = 404, description = "Unknown channel or no samples yet"),
    ),
    tag = "channels"
)]
pub async fn get_channel_window(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Query(query): Query<WindowQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    if !state.catalog.is_known(&channel) {
        return Err(AppError::NotFound(format!("Channel '{channel}' not found")));
    }

    let snapshot = state
        .windows
        .lock()
        .snapshot(&channel)
        .ok_or_else(|| AppError::NotFound(format!("Channel '{channel}' has no samples yet")))?;

    match determine_format(&query.format, &headers).as_str() {
        "csv" => build_csv_response(&snapshot.samples),
        "json" => Ok(Json(snapshot).into_response()),
        other => Err(AppError::BadRequest(format!("Unsupported format '{other}'"))),
    }
}
