//! sensorhub-pubsub — fan-out hub and per-connection batching.
//!
//! - [`Hub`]: registry of bounded subscriber queues. `broadcast` never waits:
//!   a full queue drops the point for that subscriber only.
//! - [`ConnectionAggregator`]: owns one subscription, batches arriving points
//!   and writes one message per flush tick to a [`Transport`], pinging it on an
//!   independent keepalive tick.

pub mod aggregator;
pub mod error;
pub mod hub;
pub mod ticker;
pub mod transport;

pub use aggregator::{CloseReason, ConnectionAggregator};
pub use error::TransportError;
pub use hub::{BroadcastReport, Hub, Subscribe, SubscriberId, Subscription};
pub use ticker::{IntervalTicker, ManualTicker, TickHandle, Ticker};
pub use transport::Transport;
