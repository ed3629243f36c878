use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex, MutexGuard, PoisonError,
};

use sensorhub_core::types::DataPoint;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

pub type SubscriberId = u64;

/// Consuming end of a subscriber queue plus the id needed to unsubscribe it.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub queue: mpsc::Receiver<DataPoint>,
}

/// The part of the hub a connection needs: obtain a queue, give it back.
///
/// Broadcasting is deliberately not part of this trait so connection code can
/// be tested against a double that hands out a queue the test controls.
pub trait Subscribe: Send + Sync {
    fn subscribe(&self, capacity: usize) -> Subscription;
    fn unsubscribe(&self, id: SubscriberId);
}

/// Outcome of one `broadcast` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Queues that accepted the point.
    pub delivered: usize,
    /// Queues that were full (or abandoned) and lost the point.
    pub dropped: usize,
}

/// Fan-out registry of bounded subscriber queues.
///
/// Every operation takes the registry lock for its whole duration, so a
/// broadcast sees a subscriber either entirely before or entirely after any
/// concurrent subscribe/unsubscribe. Enqueueing uses `try_send`, so holding the
/// lock never waits on a consumer.
pub struct Hub {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<DataPoint>>>,
    next_id: AtomicU64,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new bounded queue and return its consuming end.
    ///
    /// A capacity of 0 is raised to 1; a queue that can hold nothing would
    /// drop every broadcast.
    pub fn subscribe(&self, capacity: usize) -> Subscription {
        let capacity = if capacity == 0 {
            warn!("subscriber queue capacity 0 requested, using 1");
            1
        } else {
            capacity
        };

        let (tx, rx) = mpsc::channel(capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut subs = self.lock();
        subs.insert(id, tx);
        info!(subscriber_id = id, capacity, subscribers = subs.len(), "added subscriber");

        Subscription { id, queue: rx }
    }

    /// Remove a queue from the registry. Unknown ids are ignored.
    ///
    /// Returns whether the id was registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subs = self.lock();
        let removed = subs.remove(&id).is_some();
        if removed {
            info!(subscriber_id = id, subscribers = subs.len(), "removed subscriber");
        } else {
            debug!(subscriber_id = id, "unsubscribe for unknown subscriber ignored");
        }
        removed
    }

    /// Offer `point` to every registered queue without waiting.
    ///
    /// A full queue loses the point for that subscriber only. Queues whose
    /// consumer was dropped without unsubscribing are pruned.
    pub fn broadcast(&self, point: DataPoint) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut subs = self.lock();

        subs.retain(|id, tx| match tx.try_send(point.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!(subscriber_id = *id, "buffer full, message dropped");
                report.dropped += 1;
                true
            }
            Err(TrySendError::Closed(_)) => {
                warn!(subscriber_id = *id, "subscriber queue abandoned without unsubscribe, removing");
                report.dropped += 1;
                false
            }
        });

        report
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    // Registry edits are single inserts/removes, so a panic elsewhere cannot
    // leave the map half-updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<DataPoint>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscribe for Hub {
    fn subscribe(&self, capacity: usize) -> Subscription {
        Hub::subscribe(self, capacity)
    }

    fn unsubscribe(&self, id: SubscriberId) {
        Hub::unsubscribe(self, id);
    }
}
