pub mod channels;
pub mod dashboard;
pub mod health;
pub mod push;
mod rate_limit;
pub mod readings;
pub mod reports;
pub mod stream;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};

use rate_limit::FeedKeyExtractor;
pub use rate_limit::STATION_ID_HEADER;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::common::AppState;
use crate::feed::ingest_socket;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        channels::list_channels,
        channels::get_channel_window,
        readings::post_reading,
        stream::stream_events,
        reports::generate_report,
        reports::latest_report,
        push::vapid_public_key,
        push::subscribe,
        push::unsubscribe,
        push::push_status,
    ),
    components(
        schemas(
            health::HealthResponse,
            channels::ChannelResponse,
            crate::window::WindowSnapshot,
            crate::window::Sample,
            crate::channels::RefreshClass,
            readings::IngestResponse,
            crate::feed::FeedMessage,
            crate::feed::SensorEvent,
            crate::feed::TopicMessage,
            crate::station::models::PushSubscription,
            crate::station::models::PushKeys,
            crate::station::models::UnsubscribeRequest,
            crate::station::models::VapidKeyResponse,
            push::PushStatusResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "channels", description = "Chart channels and their live windows"),
        (name = "feed", description = "Sensor feed ingestion"),
        (name = "stream", description = "Live dashboard event stream"),
        (name = "reports", description = "Weather reports from the station backend"),
        (name = "push", description = "Seismic alert subscriptions"),
    ),
    info(
        title = "Meteo Dashboard API",
        description = "Live sliding-window charts for an IoT weather and seismic station",
        version = "0.1.0"
    )
)]
struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    if config.disable_rate_limiting {
        tracing::warn!("Rate limiting DISABLED");
    } else {
        tracing::info!(
            ingest_rate = %format!("{}/s burst {}", config.rate_limit_ingest_per_second, config.rate_limit_ingest_burst),
            "Rate limiting configured"
        );
    }

    // Station publishers: HTTP readings and the WebSocket feed
    let ingest_routes_base = Router::new()
        .route("/api/readings", post(readings::post_reading))
        .route("/ws/ingest", get(ingest_socket));

    let ingest_routes = if config.disable_rate_limiting {
        ingest_routes_base
    } else {
        let limiter = GovernorConfigBuilder::default()
            .key_extractor(FeedKeyExtractor)
            .per_second(config.rate_limit_ingest_per_second)
            .burst_size(config.rate_limit_ingest_burst)
            .finish();

        match limiter {
            Some(limiter) => ingest_routes_base.layer(GovernorLayer {
                config: Arc::new(limiter),
            }),
            None => {
                tracing::error!("Invalid ingest rate limit, serving feed routes unlimited");
                ingest_routes_base
            }
        }
    };

    // Viewer-facing API
    let api_routes = Router::new()
        .route("/api/channels", get(channels::list_channels))
        .route("/api/channels/{channel}/window", get(channels::get_channel_window))
        .route("/api/stream", get(stream::stream_events))
        .route("/api/reports/generate", post(reports::generate_report))
        .route("/api/reports/latest", get(reports::latest_report))
        .route("/api/push/vapid-public-key", get(push::vapid_public_key))
        .route("/api/push/subscribe", post(push::subscribe))
        .route("/api/push/unsubscribe", post(push::unsubscribe))
        .route("/api/push/status", get(push::push_status));

    // Health check and viewer page (NO rate limiting)
    let page_routes = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/", get(dashboard::dashboard));

    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    Router::new()
        .merge(api_routes)
        .merge(ingest_routes)
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .merge(page_routes)
        .merge(docs_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
