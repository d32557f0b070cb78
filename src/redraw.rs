use std::collections::HashMap;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};

use crate::channels::RefreshClass;
use crate::common::AppState;
use crate::events::DashboardEvent;

/// Tracks the last revision published per channel so unchanged charts are
/// not re-sent.
#[derive(Debug, Default)]
pub struct FrameTracker {
    published: HashMap<&'static str, u64>,
}

impl FrameTracker {
    /// Collect a frame for every channel of `class` whose window changed since
    /// the previous call. Only reads the windows.
    pub fn changed_frames(&mut self, state: &AppState, class: RefreshClass) -> Vec<DashboardEvent> {
        let windows = state.windows.lock();
        let mut frames = Vec::new();

        for channel in state.catalog.of_class(class) {
            let revision = windows.revision(channel.key);
            let last = self.published.get(channel.key).copied().unwrap_or(0);
            if revision == last {
                continue;
            }
            if let Some(snapshot) = windows.snapshot(channel.key) {
                frames.push(DashboardEvent::ChartFrame(snapshot));
            }
            self.published.insert(channel.key, revision);
        }

        frames
    }
}

/// Run the redraw timer for one class of channels.
///
/// Standard channels redraw every `STANDARD_REFRESH_MS`, the high-frequency
/// channel every `HIGH_FREQUENCY_REFRESH_MS`. Frames are only built while at
/// least one viewer is connected.
pub async fn run_redraw(state: AppState, class: RefreshClass) {
    let period_ms = match class {
        RefreshClass::Standard => state.config.standard_refresh_ms,
        RefreshClass::HighFrequency => state.config.high_frequency_refresh_ms,
    };

    tracing::info!(?class, period_ms, "Starting redraw timer");

    let mut ticker = interval(Duration::from_millis(period_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut tracker = FrameTracker::default();

    loop {
        ticker.tick().await;

        if state.events.viewer_count() == 0 {
            continue;
        }

        let frames = tracker.changed_frames(&state, class);
        if !frames.is_empty() {
            tracing::trace!(?class, frames = frames.len(), "Publishing chart frames");
        }
        for frame in frames {
            state.events.publish(frame);
        }
    }
}
