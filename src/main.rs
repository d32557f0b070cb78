use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use meteo_dash::channels::RefreshClass;
use meteo_dash::common::AppState;
use meteo_dash::config::Config;
use meteo_dash::redraw;
use meteo_dash::routes;
use meteo_dash::station::StationClient;
use meteo_dash::storage::{FileStore, KvStore, MemoryStore, WriteBehindStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,meteo_dash=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting meteo-dash...");

    // Load configuration (fail-fast)
    let config = Config::from_env()?;
    tracing::info!(
        deployment = ?config.deployment,
        host = %config.api_host,
        port = config.api_port,
        window_ms = config.window_ms,
        max_samples = config.max_samples,
        "Configuration loaded"
    );

    // Open window storage (fail-fast on an unusable directory)
    let mut disk_store: Option<Arc<WriteBehindStore<FileStore>>> = None;
    let store: Arc<dyn KvStore> = match &config.storage_dir {
        Some(dir) => {
            let file_store = FileStore::open(dir)?;
            tracing::info!(path = %file_store.root().display(), "Persisting chart windows to disk");
            let store = Arc::new(WriteBehindStore::spawn(file_store));
            disk_store = Some(store.clone());
            store
        }
        None => {
            tracing::warn!("STORAGE_DIR not set, chart windows will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    // Create station backend client
    let station_client = StationClient::new(&config)?;
    if station_client.is_configured() {
        tracing::info!("Station backend client initialized");
    } else {
        tracing::warn!("STATION_API_URL not set, reports and push alerts are unavailable");
    }

    // Create application state
    let addr = config.bind_address();
    let state = AppState::new(config, store, station_client);

    // Spawn redraw timers (fire-and-forget, non-blocking)
    tracing::info!("Spawning redraw timers...");
    tokio::spawn(redraw::run_redraw(state.clone(), RefreshClass::Standard));
    tokio::spawn(redraw::run_redraw(state.clone(), RefreshClass::HighFrequency));

    // Build router
    let app = routes::build_router(state);

    // Start server with graceful shutdown
    tracing::info!(address = %addr, "Starting server");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(store) = disk_store {
        tracing::info!(pending = store.pending(), "Flushing chart windows");
        store.flush()?;
    }

    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        },
    }
}
