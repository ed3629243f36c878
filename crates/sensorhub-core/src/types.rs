use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single sensor reading.
///
/// Wire: `{ "Value": 0.42, "Timestamp": "2024-01-01T00:00:00Z", "Id": "sensor-0" }`
///
/// Points are created once by a producer and then only ever copied: the hub
/// clones one into every subscriber queue and aggregators move them into
/// batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataPoint {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub id: String,
}

impl DataPoint {
    pub fn new(value: f64, timestamp: DateTime<Utc>, id: impl Into<String>) -> Self {
        Self {
            value,
            timestamp,
            id: id.into(),
        }
    }
}

/// One batch sent to a consumer.
///
/// Wire: `{ "Timestamp": "<flush time>", "Data": [ DataPoint, ... ] }`
///
/// `timestamp` is when the batch was closed, not the time of any contained
/// point. `data` keeps arrival order and may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    pub timestamp: DateTime<Utc>,
    pub data: Vec<DataPoint>,
}

impl Message {
    pub fn new(timestamp: DateTime<Utc>, data: Vec<DataPoint>) -> Self {
        Self { timestamp, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
