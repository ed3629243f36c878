use std::time::Duration;

use thiserror::Error;

/// Failures reported by a [`Transport`](crate::transport::Transport).
///
/// Any of these means the consumer is gone; the connection is torn down.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed the connection.
    #[error("Connection closed")]
    Closed,

    /// A frame could not be written.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// A frame write did not finish in time; the peer stopped reading.
    #[error("Write timed out after {0:?}")]
    Timeout(Duration),

    /// A batch could not be encoded for the wire.
    #[error("Encode failed: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
