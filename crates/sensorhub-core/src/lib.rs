//! sensorhub-core — shared configuration, error and data types for the
//! SensorHub streaming workspace.

pub mod config;
pub mod error;
pub mod types;

pub use config::{SensorHubConfig, WireFormat};
pub use error::{Result, SensorHubError};
pub use types::{DataPoint, Message};
