//! Server-side filter construction
//!
//! OpenProject collection endpoints accept a JSON-encoded `filters` query
//! parameter. Timestamps that end up in a filter are validated as strict
//! ISO-8601 datetimes first and re-serialized in canonical UTC form, and the
//! filter document itself is built with `serde_json`, so no caller-supplied
//! text is ever spliced into the parameter.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

/// Parse a strict ISO-8601 datetime.
///
/// Accepts RFC 3339 timestamps (`2024-01-01T00:00:00Z`,
/// `2024-06-15T12:30:45+02:00`) and offset-less timestamps
/// (`2024-06-15T12:30:45`), which are taken as UTC. Everything else,
/// including impossible calendar dates, is a validation error.
pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    if value.is_empty() {
        return Err(Error::validation("datetime must not be empty"));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| {
            Error::validation(format!(
                "'{value}' is not a valid ISO-8601 datetime (expected e.g. 2024-01-01T00:00:00Z)"
            ))
        })
}

/// Canonical representation used in filters and state
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Builder for the `filters` query parameter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    filters: Vec<Value>,
}

impl FilterSet {
    /// Create an empty filter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain `field` to values at or after `since`
    #[must_use]
    pub fn since(mut self, field: &str, since: &DateTime<Utc>) -> Self {
        self.filters.push(json!({
            field: {"operator": ">=", "values": [format_datetime(since)]}
        }));
        self
    }

    /// Constrain `field` to one of the given ids
    #[must_use]
    pub fn any_of(mut self, field: &str, ids: &[i64]) -> Self {
        let values: Vec<String> = ids.iter().map(ToString::to_string).collect();
        self.filters.push(json!({
            field: {"operator": "=", "values": values}
        }));
        self
    }

    /// Check if no filter was added
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Serialize for the `filters` query parameter
    pub fn to_query_value(&self) -> String {
        Value::Array(self.filters.clone()).to_string()
    }
}

/// `sortBy` value ordering a collection ascending by `field`
pub fn sort_ascending(field: &str) -> String {
    json!([[field, "asc"]]).to_string()
}
