//! Tests for output module

use super::*;
use crate::streams::{projects, roles};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn record(value: Value) -> crate::types::JsonObject {
    serde_json::from_value(value).unwrap()
}

// ============================================================================
// Message Tests
// ============================================================================

#[test]
fn test_schema_message_json() {
    let message = Message::schema(&projects());
    let value = serde_json::to_value(&message).unwrap();

    assert_eq!(value["type"], json!("SCHEMA"));
    assert_eq!(value["stream"], json!("projects"));
    assert_eq!(value["key_properties"], json!(["id"]));
    assert_eq!(value["bookmark_properties"], json!(["updatedAt"]));
    assert_eq!(value["schema"]["properties"]["id"]["type"], json!("integer"));
}

#[test]
fn test_schema_message_without_bookmarks() {
    let value = serde_json::to_value(Message::schema(&roles())).unwrap();
    assert!(value.get("bookmark_properties").is_none());
}

#[test]
fn test_record_message_json() {
    let message = Message::record(
        "projects",
        record(json!({"id": 1})),
        Some("2024-06-01T00:00:00Z".to_string()),
    );
    assert_eq!(
        serde_json::to_value(&message).unwrap(),
        json!({
            "type": "RECORD",
            "stream": "projects",
            "record": {"id": 1},
            "time_extracted": "2024-06-01T00:00:00Z"
        })
    );
}

#[test]
fn test_state_message_json() {
    let message = Message::state(json!({"projects": "2024-06-01T00:00:00Z"}));
    assert_eq!(
        serde_json::to_value(&message).unwrap(),
        json!({"type": "STATE", "value": {"projects": "2024-06-01T00:00:00Z"}})
    );
    assert!(message.stream().is_none());
}

#[test]
fn test_message_parses_back() {
    let line = r#"{"type":"RECORD","stream":"roles","record":{"id":3,"name":"Member"}}"#;
    let message: Message = serde_json::from_str(line).unwrap();
    assert!(message.is_record());
    assert_eq!(message.stream(), Some("roles"));
}

// ============================================================================
// Sink Tests
// ============================================================================

#[test]
fn test_json_lines_sink_writes_one_object_per_line() {
    let mut sink = JsonLinesSink::new(Vec::new());
    sink.emit(&Message::record("roles", record(json!({"id": 1})), None))
        .unwrap();
    sink.emit(&Message::state(json!({}))).unwrap();
    assert_eq!(sink.messages_written(), 2);

    let output = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<_> = output.lines().collect();
    assert_eq!(
        lines,
        vec![
            r#"{"type":"RECORD","stream":"roles","record":{"id":1}}"#,
            r#"{"type":"STATE","value":{}}"#,
        ]
    );
}

#[test]
fn test_memory_sink_helpers() {
    let mut sink = MemorySink::new();
    sink.emit(&Message::schema(&roles())).unwrap();
    sink.emit(&Message::record("roles", record(json!({"id": 1})), None))
        .unwrap();
    sink.emit(&Message::record("other", record(json!({"id": 2})), None))
        .unwrap();
    sink.emit(&Message::state(json!({"a": 1}))).unwrap();
    sink.emit(&Message::state(json!({"a": 2}))).unwrap();

    assert_eq!(sink.schema_streams(), vec!["roles"]);
    assert_eq!(sink.records("roles").len(), 1);
    assert_eq!(sink.last_state(), Some(&json!({"a": 2})));
    assert_eq!(sink.into_messages().len(), 5);
}
