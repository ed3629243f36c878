// Hub behaviour with subscribers joining and leaving while a producer
// broadcasts from another thread.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use sensorhub_core::types::DataPoint;
use sensorhub_pubsub::Hub;

const POINTS: usize = 2_000;

fn point(seq: usize) -> DataPoint {
    DataPoint::new(seq as f64, Utc::now(), "")
}

/// Whatever a subscriber saw must be one unbroken run of the broadcast
/// sequence: no gaps, no repeats, no reordering.
fn assert_contiguous(values: &[f64]) {
    for pair in values.windows(2) {
        assert_eq!(pair[1], pair[0] + 1.0, "sequence broken: {values:?}");
    }
}

#[test]
fn churning_subscribers_see_contiguous_runs() {
    let hub = Arc::new(Hub::new());

    let churners: Vec<_> = (0..4)
        .map(|_| {
            let hub = hub.clone();
            thread::spawn(move || {
                let mut runs = Vec::new();
                for _ in 0..20 {
                    // room for every point, so nothing is dropped for being full
                    let sub = hub.subscribe(POINTS);
                    thread::sleep(Duration::from_micros(200));
                    hub.unsubscribe(sub.id);

                    let mut queue = sub.queue;
                    let mut values = Vec::new();
                    while let Some(p) = queue.blocking_recv() {
                        values.push(p.value);
                    }
                    runs.push(values);
                }
                runs
            })
        })
        .collect();

    let producer = {
        let hub = hub.clone();
        thread::spawn(move || {
            for seq in 0..POINTS {
                hub.broadcast(point(seq));
                if seq % 100 == 0 {
                    thread::yield_now();
                }
            }
        })
    };

    producer.join().unwrap();
    for churner in churners {
        for run in churner.join().unwrap() {
            assert_contiguous(&run);
        }
    }
    assert_eq!(hub.subscriber_count(), 0);
}

#[test]
fn steady_subscriber_gets_everything_despite_churn() {
    let hub = Arc::new(Hub::new());
    let steady = hub.subscribe(POINTS);

    let churner = {
        let hub = hub.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                let sub = hub.subscribe(1);
                hub.unsubscribe(sub.id);
            }
        })
    };

    for seq in 0..POINTS {
        hub.broadcast(point(seq));
    }
    churner.join().unwrap();

    hub.unsubscribe(steady.id);
    let mut queue = steady.queue;
    let mut values = Vec::new();
    while let Some(p) = queue.blocking_recv() {
        values.push(p.value);
    }

    assert_eq!(values.len(), POINTS);
    assert_contiguous(&values);
}

#[test]
fn stalled_consumer_does_not_block_broadcast() {
    let hub = Hub::new();
    // never drained
    let _stalled = hub.subscribe(1);
    let live = hub.subscribe(POINTS);

    for seq in 0..POINTS {
        let report = hub.broadcast(point(seq));
        assert_eq!(report.delivered + report.dropped, 2);
    }

    hub.unsubscribe(live.id);
    let mut queue = live.queue;
    let mut received = 0;
    while queue.blocking_recv().is_some() {
        received += 1;
    }
    assert_eq!(received, POINTS);
}
