//! Built-in OpenProject stream definitions

use super::definition::StreamDefinition;
use crate::error::{Error, Result};
use crate::partition::ParentRelation;
use crate::schema::{Field, FieldType};
use std::collections::HashSet;

const UPDATED_AT: &str = "updatedAt";

fn id() -> Field {
    Field::new("id", FieldType::Integer).required()
}

fn field(name: &str, field_type: FieldType) -> Field {
    Field::new(name, field_type)
}

fn timestamps() -> [Field; 2] {
    [
        field("createdAt", FieldType::DateTime).describe("Creation timestamp"),
        field(UPDATED_AT, FieldType::DateTime).describe("Last update timestamp"),
    ]
}

fn with_timestamps(mut fields: Vec<Field>) -> Vec<Field> {
    fields.extend(timestamps());
    fields
}

/// Projects visible to the API user
pub fn projects() -> StreamDefinition {
    StreamDefinition::new(
        "projects",
        "/projects",
        with_timestamps(vec![
            id().describe("Unique project identifier"),
            field("_type", FieldType::String).describe("Resource type"),
            field("identifier", FieldType::String).describe("Project key/identifier"),
            field("name", FieldType::String).describe("Project name"),
            field("active", FieldType::Boolean).describe("Whether project is active"),
            field("public", FieldType::Boolean).describe("Whether project is public"),
            field("description", FieldType::Formattable),
            field("status", FieldType::String).describe("Project status"),
            field("statusExplanation", FieldType::Formattable),
        ]),
    )
    .with_replication_key(UPDATED_AT)
    .with_link("parent", "parent")
    .with_project_filter("id")
}

/// Work packages
pub fn work_packages() -> StreamDefinition {
    StreamDefinition::new(
        "work_packages",
        "/work_packages",
        with_timestamps(vec![
            id(),
            field("_type", FieldType::String),
            field("lockVersion", FieldType::Integer),
            field("subject", FieldType::String).describe("Work package title"),
            field("description", FieldType::Formattable),
            field("scheduleManually", FieldType::Boolean),
            field("startDate", FieldType::Date),
            field("dueDate", FieldType::Date),
            field("derivedStartDate", FieldType::Date),
            field("derivedDueDate", FieldType::Date),
            field("estimatedTime", FieldType::Duration),
            field("derivedEstimatedTime", FieldType::Duration),
            field("spentTime", FieldType::Duration),
            field("percentageDone", FieldType::Integer),
            field("derivedPercentageDone", FieldType::Integer),
            field("duration", FieldType::Duration),
            field("ignoreNonWorkingDays", FieldType::Boolean),
            field("readonly", FieldType::Boolean),
        ]),
    )
    .with_replication_key(UPDATED_AT)
    .with_links(&[
        "type",
        "status",
        "priority",
        "assignee",
        "project",
        "author",
        "responsible",
        "version",
        "parent",
    ])
    .with_project_filter("project")
}

/// Work package statuses
pub fn statuses() -> StreamDefinition {
    StreamDefinition::new(
        "statuses",
        "/statuses",
        vec![
            id(),
            field("_type", FieldType::String),
            field("name", FieldType::String),
            field("color", FieldType::String),
            field("position", FieldType::Integer),
            field("isDefault", FieldType::Boolean),
            field("isClosed", FieldType::Boolean),
            field("isReadonly", FieldType::Boolean),
            field("defaultDoneRatio", FieldType::Integer),
        ],
    )
}

/// Work package types
pub fn types() -> StreamDefinition {
    StreamDefinition::new(
        "types",
        "/types",
        with_timestamps(vec![
            id(),
            field("_type", FieldType::String),
            field("name", FieldType::String),
            field("color", FieldType::String),
            field("position", FieldType::Integer),
            field("isDefault", FieldType::Boolean),
            field("isMilestone", FieldType::Boolean),
        ]),
    )
}

/// Work package priorities
pub fn priorities() -> StreamDefinition {
    StreamDefinition::new(
        "priorities",
        "/priorities",
        vec![
            id(),
            field("_type", FieldType::String),
            field("name", FieldType::String),
            field("color", FieldType::String),
            field("position", FieldType::Integer),
            field("isDefault", FieldType::Boolean),
            field("isActive", FieldType::Boolean),
        ],
    )
}

/// Roles
pub fn roles() -> StreamDefinition {
    StreamDefinition::new(
        "roles",
        "/roles",
        vec![
            id(),
            field("_type", FieldType::String),
            field("name", FieldType::String),
        ],
    )
}

/// Users; listing them needs admin rights
pub fn users() -> StreamDefinition {
    StreamDefinition::new(
        "users",
        "/users",
        with_timestamps(vec![
            id(),
            field("_type", FieldType::String),
            field("name", FieldType::String),
            field("login", FieldType::String),
            field("firstName", FieldType::String),
            field("lastName", FieldType::String),
            field("email", FieldType::String),
            field("admin", FieldType::Boolean),
            field("avatar", FieldType::String),
            field("status", FieldType::String),
            field("language", FieldType::String),
            field("identityUrl", FieldType::String),
        ]),
    )
    .with_replication_key(UPDATED_AT)
    .requires_elevated_access()
}

/// Versions
pub fn versions() -> StreamDefinition {
    StreamDefinition::new(
        "versions",
        "/versions",
        with_timestamps(vec![
            id(),
            field("_type", FieldType::String),
            field("name", FieldType::String),
            field("description", FieldType::Formattable),
            field("startDate", FieldType::Date),
            field("endDate", FieldType::Date),
            field("status", FieldType::String),
            field("sharing", FieldType::String),
        ]),
    )
    .with_replication_key(UPDATED_AT)
    .with_link("definingProject", "defining_project")
}

/// Logged time
pub fn time_entries() -> StreamDefinition {
    StreamDefinition::new(
        "time_entries",
        "/time_entries",
        with_timestamps(vec![
            id(),
            field("_type", FieldType::String),
            field("comment", FieldType::Formattable),
            field("spentOn", FieldType::Date),
            field("hours", FieldType::Duration),
            field("ongoing", FieldType::Boolean),
        ]),
    )
    .with_replication_key(UPDATED_AT)
    .with_link("project", "project")
    .with_link("workPackage", "work_package")
    .with_link("user", "user")
    .with_link("activity", "activity")
    .with_project_filter("project")
}

/// Relations between work packages
pub fn relations() -> StreamDefinition {
    StreamDefinition::new(
        "relations",
        "/relations",
        vec![
            id(),
            field("_type", FieldType::String),
            field("name", FieldType::String),
            field("type", FieldType::String),
            field("reverseType", FieldType::String),
            field("description", FieldType::String),
            field("lag", FieldType::Integer),
        ],
    )
    .with_links(&["from", "to"])
}

/// Project memberships
pub fn memberships() -> StreamDefinition {
    StreamDefinition::new(
        "memberships",
        "/memberships",
        with_timestamps(vec![id(), field("_type", FieldType::String)]),
    )
    .with_replication_key(UPDATED_AT)
    .with_links(&["project", "principal"])
    .with_link_array("roles", "role")
    .with_project_filter("project")
}

/// Attachments of each work package
pub fn attachments() -> StreamDefinition {
    StreamDefinition::new(
        "attachments",
        "/work_packages/{work_package_id}/attachments",
        vec![
            id(),
            field("_type", FieldType::String),
            field("title", FieldType::String),
            field("fileName", FieldType::String),
            field("fileSize", FieldType::Integer),
            field("description", FieldType::Formattable),
            field("contentType", FieldType::String),
            field("digest", FieldType::AnyObject),
            field("status", FieldType::String),
            field("createdAt", FieldType::DateTime),
        ],
    )
    .with_links(&["author", "container"])
    .with_parent(ParentRelation::new(
        "work_packages",
        "id",
        "subject",
        "work_package",
    ))
}

/// All streams in declaration order
pub fn all_streams() -> Vec<StreamDefinition> {
    vec![
        projects(),
        work_packages(),
        statuses(),
        types(),
        priorities(),
        roles(),
        users(),
        versions(),
        time_entries(),
        relations(),
        memberships(),
        attachments(),
    ]
}

/// Validate a set of definitions: each one individually, unique names,
/// and parents declared before their children
pub fn validate_streams(streams: &[StreamDefinition]) -> Result<()> {
    let mut seen = HashSet::new();
    for stream in streams {
        stream.validate()?;
        if let Some(parent) = &stream.parent {
            if !seen.contains(parent.stream.as_str()) {
                return Err(Error::schema(
                    &stream.name,
                    format!("parent stream '{}' must be declared first", parent.stream),
                ));
            }
        }
        if !seen.insert(stream.name.as_str()) {
            return Err(Error::schema(
                &stream.name,
                "duplicate stream name",
            ));
        }
    }
    Ok(())
}
