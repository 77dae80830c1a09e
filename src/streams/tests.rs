//! Tests for stream definitions

use super::*;
use crate::partition::{ParentContext, ParentRelation};
use crate::schema::{Field, FieldType};
use crate::types::{JsonObject, ReplicationMethod};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn raw(value: Value) -> JsonObject {
    serde_json::from_value(value).unwrap()
}

// ============================================================================
// Registry Tests
// ============================================================================

#[test]
fn test_declaration_order() {
    let names: Vec<_> = all_streams().into_iter().map(|s| s.name).collect();
    assert_eq!(
        names,
        vec![
            "projects",
            "work_packages",
            "statuses",
            "types",
            "priorities",
            "roles",
            "users",
            "versions",
            "time_entries",
            "relations",
            "memberships",
            "attachments",
        ]
    );
}

#[test]
fn test_builtin_streams_validate() {
    validate_streams(&all_streams()).unwrap();
}

#[test]
fn test_replication_methods() {
    let incremental: Vec<_> = all_streams()
        .into_iter()
        .filter(|s| s.replication_method() == ReplicationMethod::Incremental)
        .map(|s| s.name)
        .collect();
    assert_eq!(
        incremental,
        vec![
            "projects",
            "work_packages",
            "users",
            "versions",
            "time_entries",
            "memberships"
        ]
    );
}

#[test]
fn test_only_users_requires_elevated_access() {
    let elevated: Vec<_> = all_streams()
        .into_iter()
        .filter(|s| s.requires_elevated_access)
        .map(|s| s.name)
        .collect();
    assert_eq!(elevated, vec!["users"]);
}

#[test]
fn test_project_scoped_streams() {
    let scoped: Vec<_> = all_streams()
        .into_iter()
        .filter_map(|s| s.project_filter.clone().map(|f| (s.name, f)))
        .collect();
    assert_eq!(
        scoped,
        vec![
            ("projects".to_string(), "id".to_string()),
            ("work_packages".to_string(), "project".to_string()),
            ("time_entries".to_string(), "project".to_string()),
            ("memberships".to_string(), "project".to_string()),
        ]
    );
}

#[test]
fn test_link_fields_are_declared() {
    let schema = work_packages();
    for prefix in ["type", "status", "assignee", "version", "parent"] {
        assert!(schema.schema().contains(&format!("{prefix}_id")), "{prefix}_id");
        assert!(schema.schema().contains(&format!("{prefix}_title")), "{prefix}_title");
    }

    let versions = versions();
    assert!(versions.schema().contains("defining_project_id"));

    let memberships = memberships();
    assert!(memberships.schema().contains("role_ids"));
    assert!(memberships.schema().contains("role_titles"));
}

#[test]
fn test_validate_streams_rejects_child_before_parent() {
    let streams = vec![attachments(), work_packages()];
    assert!(validate_streams(&streams).is_err());
}

#[test]
fn test_validate_streams_rejects_duplicates() {
    let streams = vec![roles(), roles()];
    assert!(validate_streams(&streams).is_err());
}

// ============================================================================
// Definition Validation Tests
// ============================================================================

#[test]
fn test_validate_rejects_undeclared_replication_key() {
    let def = StreamDefinition::new("things", "/things", vec![Field::new("id", FieldType::Integer)])
        .with_replication_key("updatedAt");
    assert!(def.validate().is_err());
}

#[test]
fn test_validate_rejects_placeholder_without_parent() {
    let def = StreamDefinition::new(
        "things",
        "/work_packages/{work_package_id}/things",
        vec![Field::new("id", FieldType::Integer)],
    );
    assert!(def.validate().is_err());
}

#[test]
fn test_validate_rejects_unknown_placeholder() {
    let def = StreamDefinition::new(
        "things",
        "/projects/{project_id}/things",
        vec![Field::new("id", FieldType::Integer)],
    )
    .with_parent(ParentRelation::new(
        "work_packages",
        "id",
        "subject",
        "work_package",
    ));
    assert!(def.validate().is_err());
}

// ============================================================================
// Path Tests
// ============================================================================

#[test]
fn test_path_for_root_stream() {
    assert_eq!(projects().path_for(None).unwrap(), "/projects");
}

#[test]
fn test_path_for_child_stream() {
    let ctx = ParentContext::new("42")
        .with_value("work_package_id", 42)
        .with_value("work_package_title", "Fix login");
    assert_eq!(
        attachments().path_for(Some(&ctx)).unwrap(),
        "/work_packages/42/attachments"
    );
}

#[test]
fn test_path_for_child_without_context() {
    assert!(attachments().path_for(None).is_err());
}

// ============================================================================
// Flatten Tests
// ============================================================================

#[test]
fn test_flatten_project_with_empty_parent_link() {
    let record = projects().flatten(
        raw(json!({"id": 1, "name": "Test Project", "_links": {"parent": {}}})),
        None,
    );
    assert_eq!(
        Value::Object(record),
        json!({"id": 1, "name": "Test Project", "parent_id": null, "parent_title": null})
    );
}

#[test]
fn test_flatten_work_package_links() {
    let record = work_packages().flatten(
        raw(json!({
            "id": 7,
            "subject": "Fix login",
            "updatedAt": "2024-06-01T10:00:00Z",
            "_embedded": {"status": {"name": "New"}},
            "_links": {
                "self": {"href": "/api/v3/work_packages/7"},
                "type": {"href": "/api/v3/types/1", "title": "Task"},
                "status": {"href": "/api/v3/statuses/1", "title": "New"},
                "assignee": {"href": null},
                "project": {"href": "/api/v3/projects/3", "title": "Demo"}
            }
        })),
        None,
    );

    assert_eq!(record["type_id"], json!(1));
    assert_eq!(record["type_title"], json!("Task"));
    assert_eq!(record["status_id"], json!(1));
    assert_eq!(record["assignee_id"], json!(null));
    assert_eq!(record["project_id"], json!(3));
    assert_eq!(record["priority_id"], json!(null));
    assert_eq!(record["priority_title"], json!(null));
    assert!(!record.contains_key("_links"));
    assert!(!record.contains_key("_embedded"));
}

#[test]
fn test_flatten_renamed_link() {
    let record = time_entries().flatten(
        raw(json!({
            "id": 5,
            "hours": "PT2H",
            "_links": {"workPackage": {"href": "/api/v3/work_packages/99", "title": "Bug"}}
        })),
        None,
    );
    assert_eq!(record["work_package_id"], json!(99));
    assert_eq!(record["work_package_title"], json!("Bug"));
    assert!(!record.contains_key("workPackage_id"));
}

#[test]
fn test_flatten_membership_roles() {
    let record = memberships().flatten(
        raw(json!({
            "id": 11,
            "_links": {
                "roles": [
                    {"href": "/api/v3/roles/3", "title": "Member"},
                    {"href": "/api/v3/roles/bad", "title": "Broken"},
                    {"href": "/api/v3/roles/5"}
                ]
            }
        })),
        None,
    );
    assert_eq!(record["role_ids"], json!([3, 5]));
    assert_eq!(record["role_titles"], json!(["Member", "Broken"]));
}

#[test]
fn test_flatten_attachment_with_parent_context() {
    let ctx = ParentContext::new("42")
        .with_value("work_package_id", 42)
        .with_value("work_package_title", "Fix login");
    let record = attachments().flatten(
        raw(json!({
            "id": 9,
            "fileName": "screen.png",
            "_links": {"author": {"href": "/api/v3/users/4", "title": "Ada"}}
        })),
        Some(&ctx),
    );
    assert_eq!(
        Value::Object(record),
        json!({
            "id": 9,
            "fileName": "screen.png",
            "author_id": 4,
            "author_title": "Ada",
            "container_id": null,
            "container_title": null,
            "work_package_id": 42,
            "work_package_title": "Fix login"
        })
    );
}

#[test]
fn test_replication_value() {
    let def = users();
    let record = raw(json!({"id": 1, "updatedAt": "2024-01-01T00:00:00Z"}));
    assert_eq!(def.replication_value(&record), Some("2024-01-01T00:00:00Z"));

    assert_eq!(roles().replication_value(&record), None);
    assert_eq!(def.replication_value(&raw(json!({"id": 1}))), None);
}
