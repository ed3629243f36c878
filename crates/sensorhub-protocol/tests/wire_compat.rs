// Verify the outbound batch format consumers rely on.
// Field names and casing are part of the contract and must not drift.

use chrono::{TimeZone, Utc};
use sensorhub_core::config::WireFormat;
use sensorhub_core::types::{DataPoint, Message};
use sensorhub_protocol::frames::{decode_batch, encode_batch, parse_count};

fn sample_batch() -> Message {
    let flushed = Utc.with_ymd_and_hms(1987, 10, 22, 0, 0, 1).unwrap();
    let first = Utc.with_ymd_and_hms(1987, 10, 22, 0, 0, 0).unwrap();
    Message::new(
        flushed,
        vec![
            DataPoint::new(0.0, first, ""),
            DataPoint::new(1.0, first + chrono::Duration::milliseconds(500), "thermo-1"),
        ],
    )
}

#[test]
fn json_batch_field_names() {
    let text = encode_batch(WireFormat::Json, &sample_batch()).unwrap();

    assert!(text.contains(r#""Timestamp":"1987-10-22T00:00:01Z""#));
    assert!(text.contains(r#""Data":["#));
    assert!(text.contains(r#""Value":1.0"#));
    assert!(text.contains(r#""Id":"thermo-1""#));
    assert!(text.contains(r#""Timestamp":"1987-10-22T00:00:00.500Z""#));
    // lowercase variants must never appear
    assert!(!text.contains(r#""data""#));
    assert!(!text.contains(r#""value""#));
}

#[test]
fn json_batch_decodes_to_same_points_in_order() {
    let batch = sample_batch();
    let text = encode_batch(WireFormat::Json, &batch).unwrap();
    let decoded = decode_batch(&text).unwrap();

    assert_eq!(decoded.timestamp, batch.timestamp);
    assert_eq!(decoded.data, batch.data);
}

#[test]
fn json_empty_batch_is_still_a_message() {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let text = encode_batch(WireFormat::Json, &Message::new(now, Vec::new())).unwrap();

    assert_eq!(text, r#"{"Timestamp":"2024-01-01T00:00:00Z","Data":[]}"#);
}

#[test]
fn count_batch_reports_point_count() {
    let text = encode_batch(WireFormat::Count, &sample_batch()).unwrap();

    assert_eq!(text, r#"NumberOfPoints="2""#);
    assert_eq!(parse_count(&text), Some(2));
}

#[test]
fn decode_rejects_non_json_frames() {
    assert!(decode_batch(r#"NumberOfPoints="2""#).is_err());
}
