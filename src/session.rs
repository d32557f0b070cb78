//! Process-wide dashboard session state.
//!
//! Created once at startup and owned by `AppState`; lives until shutdown and
//! holds the registered push endpoints and the seismic alert cooldown. The
//! endpoint set is persisted by `AppState` so alerts stay armed across
//! restarts; the cooldown is not.

use parking_lot::Mutex;
use std::collections::BTreeSet;

/// Vibration magnitude above which a seismic alert fires.
pub const DEFAULT_SEISMIC_THRESHOLD: f64 = 1.060;

/// Minimum spacing between two seismic alerts.
pub const DEFAULT_ALERT_COOLDOWN_MS: i64 = 60_000;

/// Threshold detector with a cooldown between alerts.
#[derive(Debug, Clone)]
pub struct SeismicMonitor {
    threshold: f64,
    cooldown_ms: i64,
    last_alert_ms: Option<i64>,
}

impl SeismicMonitor {
    #[must_use]
    pub fn new(threshold: f64, cooldown_ms: i64) -> Self {
        Self {
            threshold,
            cooldown_ms,
            last_alert_ms: None,
        }
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[must_use]
    pub fn last_alert_ms(&self) -> Option<i64> {
        self.last_alert_ms
    }

    /// Returns `true` when `magnitude` should raise an alert at `now_ms`.
    ///
    /// Within the cooldown of the previous alert nothing fires. Outside it, a
    /// magnitude strictly above the threshold fires and restarts the cooldown;
    /// magnitudes at or below the threshold leave the cooldown untouched.
    pub fn check(&mut self, magnitude: f64, now_ms: i64) -> bool {
        if let Some(last) = self.last_alert_ms
            && now_ms - last < self.cooldown_ms
        {
            return false;
        }

        if magnitude > self.threshold {
            self.last_alert_ms = Some(now_ms);
            return true;
        }

        false
    }
}

impl Default for SeismicMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_SEISMIC_THRESHOLD, DEFAULT_ALERT_COOLDOWN_MS)
    }
}

#[derive(Debug, Default)]
pub struct SessionContext {
    /// Push endpoints registered with the station backend
    subscriptions: Mutex<BTreeSet<String>>,
    seismic: Mutex<SeismicMonitor>,
}

impl SessionContext {
    #[must_use]
    pub fn new(seismic: SeismicMonitor) -> Self {
        Self {
            subscriptions: Mutex::new(BTreeSet::new()),
            seismic: Mutex::new(seismic),
        }
    }

    /// Whether seismic alerts are armed: at least one endpoint is subscribed.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        !self.subscriptions.lock().is_empty()
    }

    /// Returns `false` if the endpoint was already registered.
    pub fn add_subscription(&self, endpoint: &str) -> bool {
        self.subscriptions.lock().insert(endpoint.to_string())
    }

    /// Returns `false` if the endpoint was not registered.
    pub fn remove_subscription(&self, endpoint: &str) -> bool {
        self.subscriptions.lock().remove(endpoint)
    }

    #[must_use]
    pub fn has_subscription(&self, endpoint: &str) -> bool {
        self.subscriptions.lock().contains(endpoint)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Registered endpoints in sorted order.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().iter().cloned().collect()
    }

    /// Replace the registered endpoints, e.g. with the set persisted before a restart.
    pub fn restore_subscriptions(&self, endpoints: impl IntoIterator<Item = String>) {
        *self.subscriptions.lock() = endpoints.into_iter().collect();
    }

    /// Run the seismic check for a vibration reading.
    ///
    /// Alerts are only raised while a push subscription is active.
    pub fn check_seismic(&self, magnitude: f64, now_ms: i64) -> bool {
        if !self.is_subscribed() {
            return false;
        }
        self.seismic.lock().check(magnitude, now_ms)
    }

    #[must_use]
    pub fn last_alert_ms(&self) -> Option<i64> {
        self.seismic.lock().last_alert_ms()
    }
}
