//! Tests for redraw frame selection.
//!
//! Run with: cargo test --test redraw_test

use std::sync::Arc;

use meteo_dash::channels::RefreshClass;
use meteo_dash::common::AppState;
use meteo_dash::config::Config;
use meteo_dash::events::DashboardEvent;
use meteo_dash::redraw::FrameTracker;
use meteo_dash::station::StationClient;
use meteo_dash::storage::MemoryStore;

fn test_state() -> AppState {
    let config = Config::default();
    let client = StationClient::new(&config).unwrap();
    AppState::new(config, Arc::new(MemoryStore::new()), client)
}

fn frame_channels(frames: &[DashboardEvent]) -> Vec<&str> {
    frames
        .iter()
        .filter_map(|f| match f {
            DashboardEvent::ChartFrame(snapshot) => Some(snapshot.channel.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn no_frames_before_any_data() {
    let state = test_state();
    let mut tracker = FrameTracker::default();

    assert!(tracker.changed_frames(&state, RefreshClass::Standard).is_empty());
    assert!(tracker.changed_frames(&state, RefreshClass::HighFrequency).is_empty());
}

#[test]
fn only_changed_channels_are_redrawn() {
    let state = test_state();
    let mut tracker = FrameTracker::default();

    {
        let mut windows = state.windows.lock();
        windows.append("tempChart", 1_000, 20.0);
        windows.append("humChart", 1_000, 50.0);
    }

    let frames = tracker.changed_frames(&state, RefreshClass::Standard);
    assert_eq!(frame_channels(&frames), vec!["tempChart", "humChart"]);

    // Nothing new since the last tick
    assert!(tracker.changed_frames(&state, RefreshClass::Standard).is_empty());

    state.windows.lock().append("humChart", 2_000, 51.0);
    let frames = tracker.changed_frames(&state, RefreshClass::Standard);
    assert_eq!(frame_channels(&frames), vec!["humChart"]);
}

#[test]
fn refresh_classes_are_independent() {
    let state = test_state();
    let mut tracker = FrameTracker::default();

    {
        let mut windows = state.windows.lock();
        windows.append("vibrChart", 1_000, 0.4);
        windows.append("lightChart", 1_000, 800.0);
    }

    let fast = tracker.changed_frames(&state, RefreshClass::HighFrequency);
    assert_eq!(frame_channels(&fast), vec!["vibrChart"]);

    let slow = tracker.changed_frames(&state, RefreshClass::Standard);
    assert_eq!(frame_channels(&slow), vec!["lightChart"]);
}
