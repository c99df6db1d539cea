//! Tests for the message envelope and enqueue options.

use super::*;
use serde_json::json;

#[test]
fn test_encode_wraps_payload_with_operation_id() {
    let text = MessageEnvelope::encode(Some("op-1"), &json!({ "id": 7 })).unwrap();
    let json = BASE64.decode(&text).unwrap();

    assert_eq!(
        String::from_utf8(json).unwrap(),
        r#"{"_meta":{"opid":"op-1"},"_data":{"id":7}}"#
    );
}

#[test]
fn test_encode_omits_missing_operation_id() {
    let text = MessageEnvelope::encode(None, &json!([1, 2, 3])).unwrap();
    let json = BASE64.decode(&text).unwrap();

    assert_eq!(
        String::from_utf8(json).unwrap(),
        r#"{"_meta":{},"_data":[1,2,3]}"#
    );
}

#[test]
fn test_decode_restores_envelope() {
    let payload = json!({ "order": { "id": 7, "lines": ["a", "b"] } });
    let text = MessageEnvelope::encode(Some("op-9"), &payload).unwrap();

    let envelope = MessageEnvelope::decode(&text).unwrap();
    assert_eq!(envelope.meta.opid.as_deref(), Some("op-9"));
    assert_eq!(envelope.data, payload);
}

#[test]
fn test_decode_rejects_invalid_text() {
    assert!(matches!(
        MessageEnvelope::decode("not base64!"),
        Err(SerializationError::Base64(_))
    ));

    let not_json = BASE64.encode("plain text");
    assert!(matches!(
        MessageEnvelope::decode(&not_json),
        Err(SerializationError::Json(_))
    ));
}

#[test]
fn test_enqueue_options_from_task() {
    let task = Task::new("orders", json!(null)).with_ttl(120).with_delay(30);
    let options = EnqueueOptions::from_task(&task, Some("op-1"));

    assert_eq!(options.visibility_timeout, Some(30));
    assert_eq!(options.message_ttl, Some(120));
    assert_eq!(options.request_id.as_deref(), Some("op-1"));

    let options = EnqueueOptions::from_task(&Task::new("orders", json!(null)), None);
    assert_eq!(options, EnqueueOptions::default());
}
