//! sensorhub-protocol — outbound wire encoding for batched sensor data.

pub mod frames;

pub use frames::{decode_batch, encode_batch, encode_count, parse_count};
