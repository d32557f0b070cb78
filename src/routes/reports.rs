use axum::{
    Json,
    extract::State,
    http::HeaderValue,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::common::{AppState, LATEST_REPORT_KEY};
use crate::error::{AppError, AppResult};
use crate::station::models::Report;

fn report_response(report: &Report, cache_hit: bool) -> Response {
    let cache_header = if cache_hit { "HIT" } else { "MISS" };
    (
        [("X-Cache", HeaderValue::from_static(cache_header))],
        Json(report),
    )
        .into_response()
}

/// Generate a new report
///
/// Asks the station backend to analyse the recent readings. The result
/// replaces the cached latest report.
#[utoipa::path(
    post,
    path = "/api/reports/generate",
    responses(
        (status = 200, description = "Report generated"),
        (status = 502, description = "Station backend failed"),
        (status = 503, description = "Station backend not configured"),
    ),
    tag = "reports"
)]
pub async fn generate_report(State(state): State<AppState>) -> AppResult<Response> {
    tracing::info!("Requesting report generation");

    let report = state.station_client.generate_report().await?;
    tracing::info!(date = ?report.date, condition = ?report.condition, "Report generated");

    let response = report_response(&report, false);
    state
        .report_cache
        .insert(LATEST_REPORT_KEY, Arc::new(report))
        .await;

    Ok(response)
}

/// Get the latest report
#[utoipa::path(
    get,
    path = "/api/reports/latest",
    responses(
        (status = 200, description = "Latest report"),
        (status = 404, description = "No reports available"),
    ),
    tag = "reports"
)]
pub async fn latest_report(State(state): State<AppState>) -> AppResult<Response> {
    if let Some(cached) = state.report_cache.get(LATEST_REPORT_KEY).await {
        tracing::debug!("latest_report cache_hit");
        return Ok(report_response(&cached, true));
    }

    if !state.station_client.is_configured() {
        return Err(AppError::NotFound("No reports available".to_string()));
    }

    let report = state
        .station_client
        .latest_report()
        .await?
        .ok_or_else(|| AppError::NotFound("No reports available".to_string()))?;

    let response = report_response(&report, false);
    state
        .report_cache
        .insert(LATEST_REPORT_KEY, Arc::new(report))
        .await;

    Ok(response)
}
