//! HAL link resolution
//!
//! OpenProject embeds relations as `_links` entries of the form
//! `{"href": "/api/v3/users/12", "title": "Jane Doe"}`. The helpers here turn
//! those into flat `<prefix>_id` / `<prefix>_title` fields. Nothing in this
//! module fails: missing or malformed links resolve to nulls.

use crate::types::{JsonObject, JsonValue};
use serde_json::Value;

/// Identifier and title resolved from a single HAL link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkRef {
    /// Numeric id parsed from the trailing href segment
    pub id: Option<i64>,
    /// Display title copied from the link
    pub title: Option<String>,
}

impl LinkRef {
    /// Build from a single link object
    pub fn from_link(link: &JsonValue) -> Self {
        Self {
            id: extract_id(link.get("href").and_then(Value::as_str)),
            title: link.get("title").and_then(Value::as_str).map(String::from),
        }
    }

    /// Write `<prefix>_id` and `<prefix>_title` into a record
    pub fn write_into(self, record: &mut JsonObject, prefix: &str) {
        record.insert(
            format!("{prefix}_id"),
            self.id.map_or(Value::Null, Value::from),
        );
        record.insert(
            format!("{prefix}_title"),
            self.title.map_or(Value::Null, Value::String),
        );
    }
}

/// Extract the numeric id from a resource href.
///
/// `/api/v3/projects/5` and `/api/v3/users/123/` yield `5` and `123`;
/// absent hrefs and non-numeric trailing segments yield `None`.
pub fn extract_id(href: Option<&str>) -> Option<i64> {
    let href = href?;
    let trimmed = href.strip_suffix('/').unwrap_or(href);
    trimmed.rsplit('/').next()?.parse().ok()
}

/// Resolve `links[key]` into a [`LinkRef`]
pub fn resolve_link(links: Option<&JsonValue>, key: &str) -> LinkRef {
    links
        .and_then(|l| l.get(key))
        .map(LinkRef::from_link)
        .unwrap_or_default()
}

/// Resolve an array-valued link (e.g. membership roles) into parallel lists.
///
/// Ids come from elements whose href parses, titles from elements that carry
/// a title. The two lists are each order-preserving but are only index-aligned
/// when every element has both.
pub fn resolve_link_array(links: Option<&JsonValue>, key: &str) -> (Vec<i64>, Vec<String>) {
    let Some(items) = links.and_then(|l| l.get(key)).and_then(Value::as_array) else {
        return (Vec::new(), Vec::new());
    };

    let ids = items
        .iter()
        .filter_map(|item| extract_id(item.get("href").and_then(Value::as_str)))
        .collect();
    let titles = items
        .iter()
        .filter_map(|item| item.get("title").and_then(Value::as_str).map(String::from))
        .collect();

    (ids, titles)
}
