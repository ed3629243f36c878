use sensorhub_core::{config::WireFormat, error::Result, types::Message};

/// Prefix of the count-only text frame.
/// Wire: `NumberOfPoints="3"`
const COUNT_PREFIX: &str = "NumberOfPoints=\"";

/// Encode one flushed batch as a text frame in the deployment's wire format.
///
/// `Json`: `{ "Timestamp": "...", "Data": [ { "Value", "Timestamp", "Id" }, ... ] }`
/// `Count`: `NumberOfPoints="<N>"`
pub fn encode_batch(format: WireFormat, msg: &Message) -> Result<String> {
    match format {
        WireFormat::Json => Ok(serde_json::to_string(msg)?),
        WireFormat::Count => Ok(encode_count(msg.len())),
    }
}

pub fn encode_count(n: usize) -> String {
    format!("{COUNT_PREFIX}{n}\"")
}

/// Parse a count-only frame back into its point count.
pub fn parse_count(text: &str) -> Option<usize> {
    text.strip_prefix(COUNT_PREFIX)?
        .strip_suffix('"')?
        .parse()
        .ok()
}

/// Parse a JSON batch frame. Used by consumers and tests.
pub fn decode_batch(text: &str) -> Result<Message> {
    Ok(serde_json::from_str(text)?)
}
