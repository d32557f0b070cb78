//! Tests for feed decoding and ingestion into the dashboard state.
//!
//! Run with: cargo test --test feed_test

use std::sync::Arc;

use meteo_dash::channels::ChannelCatalog;
use meteo_dash::common::AppState;
use meteo_dash::config::Config;
use meteo_dash::events::DashboardEvent;
use meteo_dash::feed::{FeedMessage, SensorEvent, ingest, ingest_message};
use meteo_dash::station::StationClient;
use meteo_dash::storage::MemoryStore;

fn test_state() -> AppState {
    state_with(Config::default())
}

fn state_with(config: Config) -> AppState {
    let client = StationClient::new(&config).unwrap();
    AppState::new(config, Arc::new(MemoryStore::new()), client)
}

fn event(sensor_id: &str, value: f64, timestamp: i64) -> SensorEvent {
    SensorEvent {
        sensor_id: sensor_id.to_string(),
        value,
        timestamp,
        label: None,
        unit: None,
        topic: None,
    }
}

#[test]
fn decodes_sensor_event() {
    let msg = FeedMessage::decode(
        br#"{"sensor_id":"tempChart","value":23.4,"timestamp":1700000000000,"label":"Temperature","unit":"C"}"#,
    )
    .unwrap();

    let event = msg.into_event(&ChannelCatalog::reference(), 0).unwrap();
    assert_eq!(event.sensor_id, "tempChart");
    assert!((event.value - 23.4).abs() < f64::EPSILON);
    assert_eq!(event.timestamp, 1_700_000_000_000);
    assert_eq!(event.unit.as_deref(), Some("C"));
}

#[test]
fn topic_message_maps_to_channel_and_is_stamped() {
    let msg = FeedMessage::decode(br#"{"topic":"clima/presion","payload":" 1013.25 "}"#).unwrap();

    let event = msg.into_event(&ChannelCatalog::reference(), 42).unwrap();
    assert_eq!(event.sensor_id, "presChart");
    assert!((event.value - 1013.25).abs() < f64::EPSILON);
    assert_eq!(event.timestamp, 42);
    assert_eq!(event.topic.as_deref(), Some("clima/presion"));
}

#[test]
fn unknown_topic_or_bad_payload_resolves_to_none() {
    let catalog = ChannelCatalog::reference();

    let unknown = FeedMessage::decode(br#"{"topic":"clima/viento","payload":"3.0"}"#).unwrap();
    assert!(unknown.into_event(&catalog, 0).is_none());

    let garbage = FeedMessage::decode(br#"{"topic":"clima/lux","payload":"bright"}"#).unwrap();
    assert!(garbage.into_event(&catalog, 0).is_none());
}

#[test]
fn malformed_frame_fails_to_decode() {
    assert!(FeedMessage::decode(b"not json").is_err());
    assert!(FeedMessage::decode(br#"{"sensor_id":"tempChart"}"#).is_err());
}

#[test]
fn ingest_appends_and_echoes_sample() {
    let state = test_state();
    let mut rx = state.events.subscribe();

    assert!(ingest(&state, event("humChart", 55.0, 1_000)));

    assert_eq!(state.windows.lock().samples("humChart").len(), 1);
    assert_eq!(
        rx.try_recv().unwrap(),
        DashboardEvent::SensorData {
            sensor_id: "humChart".to_string(),
            value: 55.0,
            timestamp: 1_000,
        }
    );
}

#[test]
fn ingest_drops_unknown_channel() {
    let state = test_state();
    let mut rx = state.events.subscribe();

    assert!(!ingest(&state, event("windChart", 3.0, 1_000)));
    assert!(!state.windows.lock().has_buffer("windChart"));
    assert!(rx.try_recv().is_err());
}

#[test]
fn ingest_message_resolves_topics() {
    let state = test_state();
    let msg = FeedMessage::decode(br#"{"topic":"clima/temperatura","payload":"24.1"}"#).unwrap();

    assert!(ingest_message(&state, msg));
    assert_eq!(state.windows.lock().samples("tempChart").len(), 1);
}

#[test]
fn vibration_above_threshold_alerts_only_when_subscribed() {
    let state = test_state();
    let mut rx = state.events.subscribe();

    assert!(ingest(&state, event("vibrChart", 1.5, 1_000)));
    assert!(matches!(rx.try_recv().unwrap(), DashboardEvent::SensorData { .. }));
    assert!(rx.try_recv().is_err());

    state.session.add_subscription("https://push.example/a");
    assert!(ingest(&state, event("vibrChart", 1.5, 1_100)));
    assert!(matches!(
        rx.try_recv().unwrap(),
        DashboardEvent::SeismicAlert { magnitude, .. } if (magnitude - 1.5).abs() < f64::EPSILON
    ));
    assert!(matches!(rx.try_recv().unwrap(), DashboardEvent::SensorData { .. }));
    assert!(state.session.last_alert_ms().is_some());

    // Inside the cooldown the next spike only charts
    assert!(ingest(&state, event("vibrChart", 1.9, 1_200)));
    assert!(matches!(rx.try_recv().unwrap(), DashboardEvent::SensorData { .. }));
    assert!(rx.try_recv().is_err());
}

#[test]
fn other_channels_never_alert() {
    let state = test_state();
    state.session.add_subscription("https://push.example/a");
    let mut rx = state.events.subscribe();

    assert!(ingest(&state, event("lightChart", 4000.0, 1_000)));
    assert!(matches!(rx.try_recv().unwrap(), DashboardEvent::SensorData { .. }));
    assert!(rx.try_recv().is_err());
    assert_eq!(state.session.last_alert_ms(), None);
}

#[test]
fn rejected_non_finite_vibration_never_alerts() {
    let state = state_with(Config {
        reject_non_finite_samples: true,
        ..Config::default()
    });
    state.session.add_subscription("https://push.example/a");
    let mut rx = state.events.subscribe();

    assert!(!ingest(&state, event("vibrChart", f64::INFINITY, 1_000)));
    assert!(rx.try_recv().is_err());
    assert_eq!(state.session.last_alert_ms(), None);
    assert!(!state.windows.lock().has_buffer("vibrChart"));

    assert!(ingest(&state, event("vibrChart", 1.5, 1_100)));
    assert!(matches!(rx.try_recv().unwrap(), DashboardEvent::SeismicAlert { .. }));
}
