use async_trait::async_trait;

use crate::error::Result;

/// Outbound half of a consumer connection.
///
/// The aggregator only ever writes: batched text frames, keepalive pings and a
/// final close. Implementations map their transport's failures to
/// [`TransportError`](crate::error::TransportError).
#[async_trait]
pub trait Transport: Send {
    /// Write one text frame.
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Write a liveness probe with no payload.
    async fn send_ping(&mut self) -> Result<()>;

    /// Release the connection. Errors are swallowed; the session is over.
    async fn close(&mut self);
}
