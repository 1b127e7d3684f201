//! Event codec: JSON in, JSON out. Output shapes are compact with a fixed field order.

use serde::Serialize;
use serde_json::Value;

use crate::counters::CounterStore;
use crate::protocol::{Event, ModuleIdentity, OutboundEvent, StatusPayload};

/// Decode an inbound event. `topic` is required and must be a non-empty string;
/// `data` is optional and carried as bytes (string contents, or compact JSON for other values).
pub fn decode_event(bytes: &[u8]) -> Result<Event, DecodeError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let Value::Object(fields) = value else {
        return Err(malformed("event must be a JSON object"));
    };
    let topic = match fields.get("topic") {
        None | Some(Value::Null) => return Err(DecodeError::MissingTopic),
        Some(Value::String(s)) if s.is_empty() => return Err(DecodeError::MissingTopic),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(malformed("topic must be a string")),
    };
    let data = match fields.get("data") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => s.clone().into_bytes(),
        Some(other) => other.to_string().into_bytes(),
    };
    Ok(Event { topic, data })
}

/// Encode the status payload for `topic`, reading the two named counters from `counters`.
/// Never fails: absent counters read as 0.
pub fn encode_status(
    counters: &CounterStore,
    plugin: &str,
    topic: &str,
    is_async: bool,
    ping_counter: &str,
    pong_counter: &str,
) -> Vec<u8> {
    let status = StatusPayload {
        topic: topic.to_string(),
        pings: counters.get(ping_counter),
        pongs: counters.get(pong_counter),
        plugin: plugin.to_string(),
        is_async,
    };
    to_json(&status)
}

/// Parse a status payload produced by [`encode_status`].
pub fn decode_status(bytes: &[u8]) -> Result<StatusPayload, DecodeError> {
    let status: StatusPayload = serde_json::from_slice(bytes)?;
    if status.topic.is_empty() {
        return Err(DecodeError::MissingTopic);
    }
    Ok(status)
}

/// `{"topic":"<topic>","data":""}`, the body of every host bus publish.
pub fn encode_outbound(topic: &str) -> Vec<u8> {
    to_json(&OutboundEvent::new(topic))
}

pub fn encode_info(identity: &ModuleIdentity) -> Vec<u8> {
    to_json(identity)
}

pub fn encode_subscriptions(topics: &[String]) -> Vec<u8> {
    to_json(&topics)
}

// Only strings, integers, bools and sequences of them reach here, which serde_json always serializes.
fn to_json<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

fn malformed(reason: &str) -> DecodeError {
    DecodeError::Malformed(<serde_json::Error as serde::de::Error>::custom(reason))
}

/// Error decoding an inbound payload.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("missing topic")]
    MissingTopic,
}
