use chrono::Utc;

use crate::channels::SEISMIC_CHANNEL;
use crate::common::AppState;
use crate::events::DashboardEvent;
use crate::feed::message::{FeedMessage, SensorEvent};

/// Resolve a decoded feed message and ingest it.
///
/// Returns `false` if the message was dropped (unknown topic, unparsable
/// payload, unknown channel).
pub fn ingest_message(state: &AppState, message: FeedMessage) -> bool {
    let now_ms = Utc::now().timestamp_millis();
    match message.into_event(&state.catalog, now_ms) {
        Some(event) => ingest(state, event),
        None => {
            tracing::debug!("Dropping feed message with unknown topic or non-numeric payload");
            false
        }
    }
}

/// Push one sensor event through the dashboard.
///
/// Vibration readings are checked against the seismic threshold first, then
/// the sample is appended to its channel window and echoed to live viewers.
/// Returns `false` if the window store dropped the sample.
pub fn ingest(state: &AppState, event: SensorEvent) -> bool {
    // Rejected readings must not reach the seismic check either
    if state.config.reject_non_finite_samples && !event.value.is_finite() {
        tracing::debug!(sensor_id = %event.sensor_id, "Dropping non-finite reading");
        return false;
    }

    if event.sensor_id == SEISMIC_CHANNEL {
        let now_ms = Utc::now().timestamp_millis();
        if state.session.check_seismic(event.value, now_ms) {
            raise_seismic_alert(state, event.value, now_ms);
        }
    }

    let accepted = state
        .windows
        .lock()
        .append(&event.sensor_id, event.timestamp, event.value)
        .is_some();

    if accepted {
        state.events.publish(DashboardEvent::SensorData {
            sensor_id: event.sensor_id,
            value: event.value,
            timestamp: event.timestamp,
        });
    }

    accepted
}

fn raise_seismic_alert(state: &AppState, magnitude: f64, now_ms: i64) {
    tracing::warn!(magnitude, threshold = state.config.seismic_threshold, "Seismic threshold exceeded");

    state.events.publish(DashboardEvent::SeismicAlert {
        magnitude,
        timestamp: now_ms,
    });

    if !state.station_client.is_configured() {
        return;
    }

    // Delivery is fire-and-forget; ingestion never waits on the backend
    let client = state.station_client.clone();
    tokio::spawn(async move {
        match client.send_seismic_alert(magnitude).await {
            Ok(()) => tracing::info!(magnitude, "Seismic alert delivered"),
            Err(e) => tracing::error!(error = %e, magnitude, "Failed to deliver seismic alert"),
        }
    });
}
