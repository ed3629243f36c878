use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// A periodic event source for the aggregator loop.
///
/// `tick` must be cancel-safe: the aggregator drops an in-flight `tick` future
/// whenever another event wins the `select!`.
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next tick and return its wall-clock time.
    async fn tick(&mut self) -> DateTime<Utc>;
}

/// Wall-clock ticker backed by a tokio interval.
///
/// The first tick fires one full period after creation. Ticks missed while
/// the connection was busy writing are skipped rather than replayed.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> DateTime<Utc> {
        self.interval.tick().await;
        Utc::now()
    }
}

/// Ticker that fires only when its [`TickHandle`] says so.
///
/// Dropping every handle parks the ticker forever instead of ending the loop.
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<DateTime<Utc>>,
}

/// Sending side of a [`ManualTicker`].
#[derive(Clone)]
pub struct TickHandle {
    tx: mpsc::UnboundedSender<DateTime<Utc>>,
}

impl ManualTicker {
    pub fn new() -> (Self, TickHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, TickHandle { tx })
    }
}

impl TickHandle {
    /// Fire one tick stamped `at`. Returns false once the ticker is gone.
    pub fn fire(&self, at: DateTime<Utc>) -> bool {
        self.tx.send(at).is_ok()
    }
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) -> DateTime<Utc> {
        match self.rx.recv().await {
            Some(at) => at,
            None => std::future::pending().await,
        }
    }
}
