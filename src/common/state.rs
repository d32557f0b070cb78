use moka::future::Cache;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::channels::ChannelCatalog;
use crate::config::Config;
use crate::events::EventBus;
use crate::session::{SeismicMonitor, SessionContext};
use crate::station::StationClient;
use crate::station::models::Report;
use crate::storage::KvStore;
use crate::window::WindowStore;

/// Channel windows shared between ingestion and the redraw timers.
///
/// The lock is only held for synchronous window operations, never across an
/// `.await`.
pub type SharedWindows = Arc<Mutex<WindowStore<Arc<dyn KvStore>>>>;

/// Most recent report fetched from the station backend, keyed by `"latest"`.
pub type ReportCache = Cache<&'static str, Arc<Report>>;

pub const LATEST_REPORT_KEY: &str = "latest";

/// Storage key of the registered push endpoints.
pub const SUBSCRIPTIONS_KEY: &str = "push_subscriptions";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<ChannelCatalog>,
    pub windows: SharedWindows,
    pub session: Arc<SessionContext>,
    pub events: EventBus,
    pub station_client: Arc<StationClient>,
    pub report_cache: ReportCache,
    store: Arc<dyn KvStore>,
}

impl AppState {
    /// Build the application state and restore persisted chart windows.
    pub fn new(config: Config, store: Arc<dyn KvStore>, station_client: StationClient) -> Self {
        let catalog = ChannelCatalog::reference();
        let mut windows = WindowStore::new(catalog.clone(), config.window_config(), store.clone());
        let restored = windows.restore();
        tracing::info!(restored, "Chart windows restored from storage");

        let session = SessionContext::new(SeismicMonitor::new(
            config.seismic_threshold,
            config.alert_cooldown_ms,
        ));
        let endpoints = load_subscriptions(store.as_ref());
        if !endpoints.is_empty() {
            tracing::info!(subscribers = endpoints.len(), "Push subscriptions restored, seismic alerts armed");
        }
        session.restore_subscriptions(endpoints);

        let report_cache: ReportCache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(config.report_cache_ttl_seconds))
            .build();

        Self {
            events: EventBus::new(config.event_channel_capacity),
            catalog: Arc::new(catalog),
            windows: Arc::new(Mutex::new(windows)),
            session: Arc::new(session),
            station_client: Arc::new(station_client),
            report_cache,
            config: Arc::new(config),
            store,
        }
    }

    /// Register a push endpoint and persist the endpoint set.
    pub fn add_push_subscription(&self, endpoint: &str) {
        if self.session.add_subscription(endpoint) {
            self.persist_subscriptions();
        }
    }

    /// Forget a push endpoint and persist the endpoint set.
    pub fn remove_push_subscription(&self, endpoint: &str) {
        if self.session.remove_subscription(endpoint) {
            self.persist_subscriptions();
        }
    }

    fn persist_subscriptions(&self) {
        let endpoints = self.session.subscriptions();
        let result = serde_json::to_string(&endpoints)
            .map_err(|e| e.to_string())
            .and_then(|encoded| {
                self.store
                    .set(SUBSCRIPTIONS_KEY, encoded)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist push subscriptions");
        }
    }
}

fn load_subscriptions(store: &dyn KvStore) -> Vec<String> {
    let raw = match store.get(SUBSCRIPTIONS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read push subscriptions");
            return Vec::new();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Discarding malformed push subscriptions");
        Vec::new()
    })
}
