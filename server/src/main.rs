use axum::{Router, response::IntoResponse, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use overlay_server::config::{Config, StorageBackend};
use overlay_server::server::{build_router, shutdown_signal};
use overlay_server::{MemoryOverlayStore, MongoOverlayStore, OverlayService, OverlayStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Prometheus metrics handle for exposing metrics in Prometheus format
static PROMETHEUS_HANDLE: std::sync::OnceLock<PrometheusHandle> = std::sync::OnceLock::new();

/// Endpoint to expose metrics in Prometheus format
async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Create the storage handle shared by every request
async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn OverlayStore>> {
    let store: Arc<dyn OverlayStore> = match config.storage.backend {
        StorageBackend::MongoDb => {
            info!("Using MongoDB storage");
            Arc::new(MongoOverlayStore::connect(&config.storage).await?)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage - overlays are lost on restart");
            Arc::new(MemoryOverlayStore::new())
        }
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "overlay_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize Prometheus metrics recorder
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            PROMETHEUS_HANDLE.set(handle).ok();
        }
        Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
    }

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        "Loaded configuration: host={}, port={}, storage={:?}",
        config.host, config.port, config.storage.backend
    );

    let store = open_store(&config).await?;
    let service = OverlayService::new(store.clone());

    let app = Router::new()
        .route("/metrics/prometheus", get(prometheus_metrics))
        .merge(build_router(service, config.request_timeout));

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Overlay server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.shutdown().await;
    info!("Overlay server stopped");

    Ok(())
}
