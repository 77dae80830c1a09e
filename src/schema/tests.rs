//! Schema descriptor tests

use super::*;
use crate::types::JsonObject;
use serde_json::json;

fn sample_schema() -> StreamSchema {
    StreamSchema::new(vec![
        Field::new("id", FieldType::Integer).required(),
        Field::new("name", FieldType::String),
        Field::new("description", FieldType::Formattable),
        Field::new("startDate", FieldType::Date),
        Field::new("updatedAt", FieldType::DateTime),
        Field::new("role_ids", FieldType::array_of(FieldType::Integer)),
    ])
}

#[test]
fn test_render_required_field_is_not_nullable() {
    let schema = sample_schema().to_json_schema();

    let id = schema.get_property("id").unwrap();
    assert!(!id.is_nullable());
    assert_eq!(id.json_type.primary_type(), Some(&JsonType::Integer));
    assert_eq!(schema.required, vec!["id".to_string()]);

    let name = schema.get_property("name").unwrap();
    assert!(name.is_nullable());
}

#[test]
fn test_render_formats() {
    let schema = sample_schema().to_json_schema();

    assert_eq!(
        schema.get_property("startDate").unwrap().format.as_deref(),
        Some("date")
    );
    assert_eq!(
        schema.get_property("updatedAt").unwrap().format.as_deref(),
        Some("date-time")
    );
}

#[test]
fn test_render_formattable_object() {
    let schema = sample_schema().to_json_schema();
    let description = schema.get_property("description").unwrap();

    assert_eq!(
        description.json_type.primary_type(),
        Some(&JsonType::Object)
    );
    let props = description.properties.as_ref().unwrap();
    assert_eq!(
        props.keys().cloned().collect::<Vec<_>>(),
        vec!["format", "html", "raw"]
    );
}

#[test]
fn test_render_array_items() {
    let schema = sample_schema().to_json_schema();
    let role_ids = schema.get_property("role_ids").unwrap();
    let items = role_ids.items.as_ref().unwrap();
    assert_eq!(items.json_type.primary_type(), Some(&JsonType::Integer));
}

#[test]
fn test_render_json_shape() {
    let schema = StreamSchema::new(vec![
        Field::new("id", FieldType::Integer).required(),
        Field::new("name", FieldType::String).describe("Project name"),
    ]);

    assert_eq!(
        schema.to_json_schema().to_json(),
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer"},
                "name": {"type": ["string", "null"], "description": "Project name"}
            },
            "required": ["id"]
        })
    );
}

#[test]
fn test_nested_object_field() {
    let schema = StreamSchema::new(vec![Field::new(
        "digest",
        FieldType::Object(vec![
            Field::new("algorithm", FieldType::String),
            Field::new("hash", FieldType::String),
        ]),
    )]);

    let rendered = schema.to_json_schema();
    let digest = rendered.get_property("digest").unwrap();
    let props = digest.properties.as_ref().unwrap();
    assert!(props.contains_key("algorithm"));
    assert!(props.contains_key("hash"));
}

#[test]
fn test_validate_ok() {
    let schema = sample_schema();
    assert!(schema
        .validate("projects", &["id".to_string()], Some("updatedAt"))
        .is_ok());
    assert!(schema.validate("projects", &["id".to_string()], None).is_ok());
}

#[test]
fn test_validate_rejects_missing_primary_key() {
    let schema = sample_schema();
    let err = schema
        .validate("projects", &["uuid".to_string()], None)
        .unwrap_err();
    assert!(err.to_string().contains("primary key 'uuid'"));

    assert!(schema.validate("projects", &[], None).is_err());
}

#[test]
fn test_validate_rejects_bad_replication_key() {
    let schema = sample_schema();
    assert!(schema
        .validate("projects", &["id".to_string()], Some("lockVersion"))
        .is_err());
    assert!(schema
        .validate("projects", &["id".to_string()], Some("name"))
        .is_err());
}

#[test]
fn test_validate_rejects_duplicate_fields() {
    let mut schema = sample_schema();
    schema.push(Field::new("name", FieldType::String));
    let err = schema
        .validate("projects", &["id".to_string()], None)
        .unwrap_err();
    assert!(err.to_string().contains("duplicate field 'name'"));
}

#[test]
fn test_conform_drops_undeclared_properties() {
    let schema = sample_schema();
    let record: JsonObject = serde_json::from_value(json!({
        "id": 1,
        "name": "Demo",
        "_links": {"self": {"href": "/api/v3/projects/1"}},
        "_type": "Project"
    }))
    .unwrap();

    let conformed = schema.conform(record);
    assert_eq!(
        serde_json::Value::Object(conformed),
        json!({"id": 1, "name": "Demo"})
    );
}
