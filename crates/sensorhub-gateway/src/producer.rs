use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sensorhub_core::config::ProducerConfig;
use sensorhub_core::types::DataPoint;
use sensorhub_pubsub::Hub;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};

/// Stand-in sensor: broadcasts `sin(2π·t/period)` at a fixed rate, where `t`
/// is wall-clock seconds since the Unix epoch.
pub struct SineProducer {
    hub: Arc<Hub>,
    interval: Duration,
    period_secs: f64,
    sensor_id: String,
}

impl SineProducer {
    pub fn new(hub: Arc<Hub>, config: &ProducerConfig) -> Self {
        Self {
            hub,
            interval: Duration::from_millis(config.interval_ms),
            period_secs: config.period_secs,
            sensor_id: config.sensor_id.clone(),
        }
    }

    pub fn sample(&self, at: DateTime<Utc>) -> DataPoint {
        DataPoint::new(sine_at(at, self.period_secs), at, self.sensor_id.clone())
    }

    /// Broadcast one sample per interval until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            sensor_id = %self.sensor_id,
            interval_ms = self.interval.as_millis() as u64,
            "sample producer started"
        );

        let mut tick = tokio::time::interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tick.tick() => {
                    let report = self.hub.broadcast(self.sample(Utc::now()));
                    trace!(delivered = report.delivered, dropped = report.dropped, "sample broadcast");
                }
            }
        }

        info!(sensor_id = %self.sensor_id, "sample producer stopped");
    }
}

fn sine_at(at: DateTime<Utc>, period_secs: f64) -> f64 {
    let secs = at.timestamp_millis() as f64 / 1e3;
    (2.0 * PI * secs / period_secs).sin()
}
