use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use sensorhub_pubsub::{Transport, TransportError};

/// Write half of an upgraded WebSocket.
pub struct WsTransport {
    sink: SplitSink<WebSocket, Message>,
}

impl WsTransport {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self { sink }
    }
}

fn send_failed(e: axum::Error) -> TransportError {
    TransportError::SendFailed(e.to_string())
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sink.send(Message::Text(text.into())).await.map_err(send_failed)
    }

    async fn send_ping(&mut self) -> Result<(), TransportError> {
        self.sink.send(Message::Ping(Bytes::new())).await.map_err(send_failed)
    }

    async fn close(&mut self) {
        // peer may already be gone
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}
