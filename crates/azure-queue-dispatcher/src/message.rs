//! Message envelope and enqueue options.

use crate::error::SerializationError;
use crate::task::Task;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;

/// Metadata stamped onto every dispatched message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opid: Option<String>,
}

/// JSON envelope wrapping a task payload on the wire
///
/// Encoded form is `{"_meta":{"opid":...},"_data":...}` serialized to JSON and
/// then base64-encoded, which keeps arbitrary payloads XML-safe inside the
/// Put Message request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    #[serde(rename = "_meta", default)]
    pub meta: EnvelopeMeta,
    #[serde(rename = "_data", default)]
    pub data: Value,
}

impl MessageEnvelope {
    pub fn new(operation_id: Option<&str>, payload: Value) -> Self {
        Self {
            meta: EnvelopeMeta {
                opid: operation_id.map(str::to_string),
            },
            data: payload,
        }
    }

    /// Serialize and base64-encode a payload into queue message text
    pub fn encode(operation_id: Option<&str>, payload: &Value) -> Result<String, SerializationError> {
        let envelope = Self::new(operation_id, payload.clone());
        let json = serde_json::to_vec(&envelope)?;
        Ok(BASE64.encode(json))
    }

    /// Decode queue message text produced by [`MessageEnvelope::encode`]
    pub fn decode(text: &str) -> Result<Self, SerializationError> {
        let bytes = BASE64.decode(text.trim())?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Per-message options for the Put Message call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnqueueOptions {
    /// Seconds before the message becomes visible
    pub visibility_timeout: Option<u64>,
    /// Seconds before the message expires
    pub message_ttl: Option<u64>,
    /// Client request id sent as `x-ms-client-request-id`
    pub request_id: Option<String>,
}

impl EnqueueOptions {
    pub fn from_task(task: &Task, request_id: Option<&str>) -> Self {
        Self {
            visibility_timeout: task.delay,
            message_ttl: task.ttl,
            request_id: request_id.map(str::to_string),
        }
    }
}

/// Receipt returned by the queue service for an enqueued message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueuedMessage {
    pub message_id: String,
    pub pop_receipt: String,
    pub insertion_time: Option<DateTime<Utc>>,
    pub expiration_time: Option<DateTime<Utc>>,
    pub time_next_visible: Option<DateTime<Utc>>,
}
