use axum::{
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::StreamExt;
use sensorhub_pubsub::ConnectionAggregator;
use std::sync::Arc;
use tracing::{debug, info};

use crate::app::AppState;
use crate::ws::transport::WsTransport;

/// Axum handler — upgrades HTTP to WebSocket at GET /sensordata.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let connections = state.connections.clone();
    ws.on_upgrade(move |socket| connections.track_future(run_connection(socket, state)))
}

/// Per-connection session: the aggregator owns the write half, a reader task
/// watches the read half so a client hang-up ends the session promptly.
async fn run_connection(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    info!(conn_id = %conn_id, "new WS connection");

    let (sink, mut stream) = socket.split();
    let conn_token = state.shutdown.child_token();

    // Inbound frames carry nothing we act on; reading them keeps ping/pong
    // and close handshakes flowing.
    let reader_token = conn_token.clone();
    let reader_conn_id = conn_id.clone();
    let reader = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(conn_id = %reader_conn_id, error = %e, "WS read failed");
                    break;
                }
            }
        }
        reader_token.cancel();
    });

    let aggregator = ConnectionAggregator::new(
        conn_id.clone(),
        state.hub.clone(),
        WsTransport::new(sink),
        &state.config.stream,
    )
    .with_shutdown(conn_token);

    let reason = aggregator.run().await;
    reader.abort();
    info!(conn_id = %conn_id, reason = %reason, "WS connection closed");
}
