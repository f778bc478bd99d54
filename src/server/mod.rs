//! HTTP and websocket surface.
//!
//! ```text
//!   GET  /api/chart-config   current configuration (+ isSelected, defaultSearchRange)
//!   POST /api/chart-config   partial update, validated and persisted
//!   GET  /api/health         liveness plus store reachability
//!   GET  /ws                 chart and live-data event protocol
//!   *                        static files from the public directory
//! ```

pub mod api;
pub mod protocol;
pub mod socket;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::service::ChartService;

pub use protocol::{ClientEvent, ServerEvent};

/// State shared by every handler and connection.
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: ChartService,
    pub live_interval: Duration,
    /// Cancelled on process shutdown; connections derive child tokens from it.
    pub shutdown: CancellationToken,
    connections: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(service: ChartService, live_interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            service,
            live_interval,
            shutdown,
            connections: Arc::new(AtomicU64::new(0)),
        }
    }

    fn next_connection_id(&self) -> u64 {
        self.connections.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Build the application router.
pub fn router(state: AppState, public_dir: &Path) -> Router {
    Router::new()
        .route(
            "/api/chart-config",
            get(api::get_chart_config).post(api::update_chart_config),
        )
        .route("/api/health", get(api::health))
        .route("/ws", get(socket::upgrade))
        .fallback_service(ServeDir::new(public_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the state's shutdown token is cancelled.
pub async fn serve(listener: TcpListener, state: AppState, public_dir: &Path) -> std::io::Result<()> {
    let shutdown = state.shutdown.clone();
    if let Ok(addr) = listener.local_addr() {
        info!("Server is running on http://{}", addr);
    }

    axum::serve(listener, router(state, public_dir))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
