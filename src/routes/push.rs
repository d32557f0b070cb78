use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::common::AppState;
use crate::error::AppResult;
use crate::station::models::{PushSubscription, UnsubscribeRequest, VapidKeyResponse};

#[derive(Debug, Serialize, ToSchema)]
pub struct PushStatusResponse {
    /// Whether seismic alerts are armed (at least one endpoint subscribed)
    pub armed: bool,
    pub subscribers: usize,
    /// Whether the endpoint given in the query is registered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribed: Option<bool>,
    /// Wall-clock time of the last seismic alert (ms since epoch)
    pub last_alert: Option<i64>,
    pub seismic_threshold: f64,
}

/// Get the VAPID public key
///
/// Served from configuration when set, otherwise fetched from the station backend.
#[utoipa::path(
    get,
    path = "/api/push/vapid-public-key",
    responses(
        (status = 200, description = "Application server key", body = VapidKeyResponse),
        (status = 503, description = "No key configured and no station backend"),
    ),
    tag = "push"
)]
pub async fn vapid_public_key(State(state): State<AppState>) -> AppResult<Json<VapidKeyResponse>> {
    let public_key = match &state.config.vapid_public_key {
        Some(key) => key.clone(),
        None => state.station_client.vapid_public_key().await?,
    };

    Ok(Json(VapidKeyResponse { public_key }))
}

/// Subscribe to push notifications
///
/// Registers the browser subscription with the station backend and arms the
/// seismic alert.
#[utoipa::path(
    post,
    path = "/api/push/subscribe",
    request_body = PushSubscription,
    responses(
        (status = 201, description = "Subscription registered"),
        (status = 502, description = "Station backend rejected the subscription"),
    ),
    tag = "push"
)]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(subscription): Json<PushSubscription>,
) -> AppResult<StatusCode> {
    state.station_client.subscribe(&subscription).await?;
    state.add_push_subscription(&subscription.endpoint);

    tracing::info!(endpoint = %subscription.endpoint, "Push subscription registered");
    Ok(StatusCode::CREATED)
}

/// Unsubscribe from push notifications
#[utoipa::path(
    post,
    path = "/api/push/unsubscribe",
    request_body = UnsubscribeRequest,
    responses(
        (status = 204, description = "Subscription removed"),
        (status = 502, description = "Station backend failed"),
    ),
    tag = "push"
)]
pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(request): Json<UnsubscribeRequest>,
) -> AppResult<StatusCode> {
    state.station_client.unsubscribe(&request.endpoint).await?;
    state.remove_push_subscription(&request.endpoint);

    tracing::info!(endpoint = %request.endpoint, "Push subscription removed");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PushStatusQuery {
    /// Push endpoint of the calling browser
    pub endpoint: Option<String>,
}

/// Get the push subscription status
///
/// A browser passes its own endpoint to learn whether it is still registered,
/// e.g. after a restart of the dashboard.
#[utoipa::path(
    get,
    path = "/api/push/status",
    params(PushStatusQuery),
    responses(
        (status = 200, description = "Subscription status", body = PushStatusResponse),
    ),
    tag = "push"
)]
pub async fn push_status(
    State(state): State<AppState>,
    Query(query): Query<PushStatusQuery>,
) -> Json<PushStatusResponse> {
    Json(PushStatusResponse {
        armed: state.session.is_subscribed(),
        subscribers: state.session.subscriber_count(),
        subscribed: query
            .endpoint
            .as_deref()
            .map(|endpoint| state.session.has_subscription(endpoint)),
        last_alert: state.session.last_alert_ms(),
        seismic_threshold: state.config.seismic_threshold,
    })
}
