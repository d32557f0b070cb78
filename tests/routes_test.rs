//! Router tests against an in-memory dashboard with no station backend.
//!
//! Run with: cargo test --test routes_test

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use futures::StreamExt;
use serde_json::Value;
use tower::ServiceExt;

use meteo_dash::common::AppState;
use meteo_dash::config::Config;
use meteo_dash::routes::build_router;
use meteo_dash::station::StationClient;
use meteo_dash::storage::MemoryStore;

fn test_state(config: Config) -> AppState {
    let client = StationClient::new(&config).unwrap();
    AppState::new(config, Arc::new(MemoryStore::new()), client)
}

fn app() -> (Router, AppState) {
    let state = test_state(Config::default());
    (build_router(state.clone()), state)
}

async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(app: &Router, uri: &str, body: &str) -> Response {
    app.clone()
        .oneshot(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_reports_live_state() {
    let (app, _) = app();

    let response = get(&app, "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["live_channels"], 0);
    assert_eq!(body["station_configured"], false);
}

#[tokio::test]
async fn lists_reference_channels() {
    let (app, _) = app();

    let body = json_body(get(&app, "/api/channels").await).await;
    let channels = body.as_array().unwrap();

    let keys: Vec<&str> = channels.iter().map(|c| c["key"].as_str().unwrap()).collect();
    assert_eq!(
        keys,
        ["tempChart", "presChart", "humChart", "soilChart", "lightChart", "vibrChart"]
    );
    assert_eq!(channels[5]["refresh"], "high_frequency");
    assert_eq!(channels[0]["samples"], 0);
    assert!(channels[0]["window_start"].is_null());
}

#[tokio::test]
async fn window_is_not_found_until_data_arrives() {
    let (app, _) = app();

    let unknown = get(&app, "/api/channels/windChart/window").await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let empty = get(&app, "/api/channels/tempChart/window").await;
    assert_eq!(empty.status(), StatusCode::NOT_FOUND);
    assert!(json_body(empty).await["error"].is_string());
}

#[tokio::test]
async fn posted_reading_shows_up_in_window() {
    let (app, _) = app();

    let response = post_json(
        &app,
        "/api/readings",
        r#"{"sensor_id":"tempChart","value":21.5,"timestamp":1700000600000}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(response).await["accepted"], true);

    let body = json_body(get(&app, "/api/channels/tempChart/window").await).await;
    assert_eq!(body["channel"], "tempChart");
    assert_eq!(body["window_start"], 1_700_000_000_000_i64);
    assert_eq!(body["window_end"], 1_700_000_600_000_i64);
    assert_eq!(body["samples"][0]["x"], 1_700_000_600_000_i64);
    assert_eq!(body["samples"][0]["y"], 21.5);
}

#[tokio::test]
async fn window_exports_csv() {
    let (app, _) = app();
    post_json(
        &app,
        "/api/readings",
        r#"{"sensor_id":"humChart","value":40.0,"timestamp":1000}"#,
    )
    .await;

    let response = get(&app, "/api/channels/humChart/window?format=csv").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(std::str::from_utf8(&bytes).unwrap(), "timestamp,value\n1000,40\n");

    let bad = get(&app, "/api/channels/humChart/window?format=xml").await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn readings_reject_malformed_bodies() {
    let (app, _) = app();

    let response = post_json(&app, "/api/readings", "{oops").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let dropped = post_json(
        &app,
        "/api/readings",
        r#"{"topic":"clima/viento","payload":"3.2"}"#,
    )
    .await;
    assert_eq!(dropped.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(dropped).await["accepted"], false);
}

#[tokio::test]
async fn push_status_defaults_to_unsubscribed() {
    let (app, _) = app();

    let body = json_body(get(&app, "/api/push/status").await).await;
    assert_eq!(body["armed"], false);
    assert_eq!(body["subscribers"], 0);
    assert!(body.get("subscribed").is_none());
    assert!(body["last_alert"].is_null());
    assert_eq!(body["seismic_threshold"], 1.06);
}

#[tokio::test]
async fn vapid_key_served_from_config() {
    let state = test_state(Config {
        vapid_public_key: Some("BPublicKey".to_string()),
        ..Config::default()
    });
    let app = build_router(state);

    let body = json_body(get(&app, "/api/push/vapid-public-key").await).await;
    assert_eq!(body["publicKey"], "BPublicKey");
}

#[tokio::test]
async fn station_routes_without_backend() {
    let (app, _) = app();

    let latest = get(&app, "/api/reports/latest").await;
    assert_eq!(latest.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(latest).await["error"], "No reports available");

    let generate = app
        .clone()
        .oneshot(
            Request::post("/api/reports/generate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(generate.status(), StatusCode::SERVICE_UNAVAILABLE);

    let key = get(&app, "/api/push/vapid-public-key").await;
    assert_eq!(key.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn stream_starts_with_snapshot_frames() {
    let (app, state) = app();
    state.windows.lock().append("presChart", 5_000, 1012.5);

    let response = get(&app, "/api/stream").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let mut body = response.into_body().into_data_stream();
    let first = body.next().await.unwrap().unwrap();
    let text = std::str::from_utf8(&first).unwrap();
    assert!(text.contains("event: chart_frame"));
    assert!(text.contains(r#""channel":"presChart""#));
}

#[tokio::test]
async fn serves_viewer_page() {
    let (app, _) = app();

    let response = get(&app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(std::str::from_utf8(&bytes).unwrap().contains("/api/stream"));
}

#[tokio::test]
async fn push_status_reports_calling_endpoint() {
    let (app, state) = app();
    state.add_push_subscription("https://push.example/a");

    let body = json_body(get(&app, "/api/push/status?endpoint=https%3A%2F%2Fpush.example%2Fa").await).await;
    assert_eq!(body["armed"], true);
    assert_eq!(body["subscribers"], 1);
    assert_eq!(body["subscribed"], true);

    let other = json_body(get(&app, "/api/push/status?endpoint=https%3A%2F%2Fpush.example%2Fb").await).await;
    assert_eq!(other["armed"], true);
    assert_eq!(other["subscribed"], false);
}
