use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sensorhub_core::config::{StreamConfig, WireFormat};
use sensorhub_core::types::{DataPoint, Message};
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{self, TransportError};
use crate::hub::{Subscribe, Subscription};
use crate::ticker::{IntervalTicker, Ticker};
use crate::transport::Transport;

/// Why an aggregator stopped. Every variant ends in the same teardown:
/// unsubscribe, then close the transport.
#[derive(Debug)]
pub enum CloseReason {
    /// Writing a batch failed; the consumer is gone.
    FlushFailed(TransportError),
    /// Writing a ping failed; the consumer is gone.
    KeepaliveFailed(TransportError),
    /// The hub dropped the producing end of the queue.
    QueueClosed,
    /// The shutdown token fired: process exit or the peer hung up.
    Shutdown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FlushFailed(e) => write!(f, "flush failed: {e}"),
            Self::KeepaliveFailed(e) => write!(f, "keepalive failed: {e}"),
            Self::QueueClosed => write!(f, "queue closed"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Per-connection batcher: one subscription in, one message per flush tick out.
pub struct ConnectionAggregator<T: Transport> {
    conn_id: String,
    hub: Arc<dyn Subscribe>,
    transport: T,
    flush: Box<dyn Ticker>,
    keepalive: Box<dyn Ticker>,
    queue_capacity: usize,
    wire_format: WireFormat,
    write_timeout: Duration,
    shutdown: CancellationToken,
}

impl<T: Transport> ConnectionAggregator<T> {
    /// Aggregator with wall-clock timers taken from `config`.
    pub fn new(
        conn_id: impl Into<String>,
        hub: Arc<dyn Subscribe>,
        transport: T,
        config: &StreamConfig,
    ) -> Self {
        Self {
            conn_id: conn_id.into(),
            hub,
            transport,
            flush: Box::new(IntervalTicker::new(Duration::from_millis(
                config.flush_interval_ms,
            ))),
            keepalive: Box::new(IntervalTicker::new(Duration::from_millis(
                config.keepalive_interval_ms,
            ))),
            queue_capacity: config.queue_capacity,
            wire_format: config.wire_format,
            write_timeout: Duration::from_millis(config.write_timeout_ms),
            shutdown: CancellationToken::new(),
        }
    }

    /// Replace both timers, e.g. with manually driven ones.
    pub fn with_tickers(mut self, flush: Box<dyn Ticker>, keepalive: Box<dyn Ticker>) -> Self {
        self.flush = flush;
        self.keepalive = keepalive;
        self
    }

    /// Stop the loop (and unsubscribe) when `token` is cancelled.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Subscribe, run the event loop until the connection ends, then
    /// unsubscribe and close the transport.
    pub async fn run(mut self) -> CloseReason {
        let Subscription { id, mut queue } = self.hub.subscribe(self.queue_capacity);
        debug!(conn_id = %self.conn_id, subscriber_id = id, "aggregator open");

        let mut buffer: Vec<DataPoint> = Vec::new();

        let reason = loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break CloseReason::Shutdown,

                point = queue.recv() => match point {
                    Some(point) => buffer.push(point),
                    None => break CloseReason::QueueClosed,
                },

                at = self.flush.tick() => {
                    // Points already queued when the timer fired belong to this batch.
                    drain_ready(&mut queue, &mut buffer);
                    let batch = Message::new(at, std::mem::take(&mut buffer));
                    let frame = match sensorhub_protocol::encode_batch(self.wire_format, &batch) {
                        Ok(frame) => frame,
                        Err(e) => break CloseReason::FlushFailed(TransportError::Encode(e.to_string())),
                    };
                    let sent = bounded_write(
                        &self.shutdown,
                        self.write_timeout,
                        self.transport.send_text(frame),
                    )
                    .await;
                    match sent {
                        Some(Ok(())) => {}
                        Some(Err(e)) => break CloseReason::FlushFailed(e),
                        None => break CloseReason::Shutdown,
                    }
                    debug!(conn_id = %self.conn_id, points = batch.len(), "batch sent");
                }

                _ = self.keepalive.tick() => {
                    let sent = bounded_write(
                        &self.shutdown,
                        self.write_timeout,
                        self.transport.send_ping(),
                    )
                    .await;
                    match sent {
                        Some(Ok(())) => {}
                        Some(Err(e)) => break CloseReason::KeepaliveFailed(e),
                        None => break CloseReason::Shutdown,
                    }
                }
            }
        };

        // Unsubscribe before tearing the transport down so the hub never
        // holds a queue nobody drains.
        self.hub.unsubscribe(id);
        if time::timeout(self.write_timeout, self.transport.close()).await.is_err() {
            debug!(conn_id = %self.conn_id, "transport close timed out");
        }
        info!(conn_id = %self.conn_id, subscriber_id = id, reason = %reason, "connection closed");

        reason
    }
}

/// Run one transport write, giving up when it outlives `wait`.
///
/// `None` means shutdown fired first; the write is abandoned.
async fn bounded_write<F>(
    shutdown: &CancellationToken,
    wait: Duration,
    write: F,
) -> Option<error::Result<()>>
where
    F: Future<Output = error::Result<()>>,
{
    tokio::select! {
        _ = shutdown.cancelled() => None,
        sent = time::timeout(wait, write) => {
            Some(sent.unwrap_or(Err(TransportError::Timeout(wait))))
        }
    }
}

fn drain_ready(queue: &mut mpsc::Receiver<DataPoint>, buffer: &mut Vec<DataPoint>) {
    while let Ok(point) = queue.try_recv() {
        buffer.push(point);
    }
}
