use axum::{routing::get, Router};
use sensorhub_core::config::SensorHubConfig;
use sensorhub_pubsub::Hub;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: SensorHubConfig,
    pub hub: Arc<Hub>,
    /// Cancelled on process shutdown; each connection watches a child token.
    pub shutdown: CancellationToken,
    /// Upgraded WebSocket sessions; the server does not wait for these itself.
    pub connections: TaskTracker,
}

impl AppState {
    pub fn new(config: SensorHubConfig, hub: Arc<Hub>, shutdown: CancellationToken) -> Self {
        Self {
            config,
            hub,
            shutdown,
            connections: TaskTracker::new(),
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/sensordata", get(crate::ws::connection::ws_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
