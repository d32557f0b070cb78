//! Events pushed to live dashboard viewers.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::window::WindowSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEvent {
    /// A sample accepted into a channel window
    SensorData {
        sensor_id: String,
        value: f64,
        timestamp: i64,
    },
    /// Redraw of one chart
    ChartFrame(WindowSnapshot),
    /// Vibration crossed the seismic threshold
    SeismicAlert { magnitude: f64, timestamp: i64 },
}

impl DashboardEvent {
    /// SSE event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SensorData { .. } => "sensor_data",
            Self::ChartFrame(_) => "chart_frame",
            Self::SeismicAlert { .. } => "seismic_alert",
        }
    }
}

/// Fan-out of dashboard events to every connected viewer.
///
/// Publishing never blocks; slow viewers lag and skip events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DashboardEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns the number of viewers that received the event.
    pub fn publish(&self, event: DashboardEvent) -> usize {
        // No receivers is the normal state when nobody has the dashboard open
        self.tx.send(event).unwrap_or(0)
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn viewer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
