//! Singer catalog discovery and stream selection
//!
//! Discovery describes every stream with its schema, keys and breadcrumb
//! metadata. A catalog passed back on sync restricts the run to the streams
//! whose top-level entry is explicitly selected.

use crate::error::{Error, Result};
use crate::streams::StreamDefinition;
use crate::types::{JsonObject, JsonValue, ReplicationMethod};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::path::Path;

// ============================================================================
// Catalog Types
// ============================================================================

/// Singer catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Catalog entries
    #[serde(default)]
    pub streams: Vec<CatalogEntry>,
}

/// One stream in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stream identifier
    pub tap_stream_id: String,

    /// Stream name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,

    /// JSON schema for the stream
    #[serde(default)]
    pub schema: JsonValue,

    /// Primary key fields
    #[serde(default)]
    pub key_properties: Vec<String>,

    /// Replication key field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,

    /// Replication method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_method: Option<ReplicationMethod>,

    /// Breadcrumb metadata
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,

    /// Legacy entry-level selection flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
}

/// Metadata attached to a breadcrumb path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Path into the schema; empty for the stream itself
    #[serde(default)]
    pub breadcrumb: Vec<String>,

    /// Metadata values
    #[serde(default)]
    pub metadata: JsonObject,
}

impl MetadataEntry {
    fn new(breadcrumb: Vec<String>, metadata: JsonValue) -> Self {
        Self {
            breadcrumb,
            metadata: match metadata {
                JsonValue::Object(map) => map,
                _ => JsonObject::new(),
            },
        }
    }
}

impl Catalog {
    /// Describe `streams` as a catalog with every stream selected
    pub fn discover(streams: &[StreamDefinition]) -> Self {
        Self {
            streams: streams.iter().map(CatalogEntry::discover).collect(),
        }
    }

    /// Parse a catalog document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::catalog(format!("Failed to parse catalog: {e}")))
    }

    /// Load a catalog file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::catalog(format!("Failed to read catalog {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    /// Find the entry for a stream
    pub fn get(&self, stream: &str) -> Option<&CatalogEntry> {
        self.streams.iter().find(|entry| entry.name() == stream)
    }

    /// Render the catalog as JSON
    pub fn to_value(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl CatalogEntry {
    fn discover(stream: &StreamDefinition) -> Self {
        let mut top_level = json!({
            "inclusion": "available",
            "selected": true,
            "table-key-properties": stream.primary_keys,
            "forced-replication-method": stream.replication_method(),
        });
        if let Some(key) = &stream.replication_key {
            top_level["valid-replication-keys"] = json!([key]);
        }

        let mut metadata = vec![MetadataEntry::new(Vec::new(), top_level)];
        for field in stream.schema().fields() {
            let automatic = stream.primary_keys.contains(&field.name)
                || stream.replication_key.as_deref() == Some(field.name.as_str());
            metadata.push(MetadataEntry::new(
                vec!["properties".to_string(), field.name.clone()],
                json!({"inclusion": if automatic { "automatic" } else { "available" }}),
            ));
        }

        Self {
            tap_stream_id: stream.name.clone(),
            stream: Some(stream.name.clone()),
            schema: stream.schema().to_json_schema().to_json(),
            key_properties: stream.primary_keys.clone(),
            replication_key: stream.replication_key.clone(),
            replication_method: Some(stream.replication_method()),
            metadata,
            selected: None,
        }
    }

    /// Stream name, falling back to the stream id
    pub fn name(&self) -> &str {
        self.stream.as_deref().unwrap_or(&self.tap_stream_id)
    }

    /// Top-level breadcrumb metadata
    pub fn top_level_metadata(&self) -> Option<&JsonObject> {
        self.metadata
            .iter()
            .find(|m| m.breadcrumb.is_empty())
            .map(|m| &m.metadata)
    }

    /// A stream is selected only when its top-level `selected` flag is `true`
    pub fn is_selected(&self) -> bool {
        let flag = self
            .top_level_metadata()
            .and_then(|m| m.get("selected"))
            .and_then(JsonValue::as_bool)
            .or(self.selected);
        flag == Some(true)
    }
}

// ============================================================================
// Selection
// ============================================================================

/// Which streams a sync run covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    /// No catalog given: every stream
    #[default]
    All,
    /// Streams selected in a catalog
    Streams(HashSet<String>),
}

impl Selection {
    /// Derive the selection from an optional catalog
    pub fn from_catalog(catalog: Option<&Catalog>) -> Self {
        match catalog {
            None => Self::All,
            Some(catalog) => Self::Streams(
                catalog
                    .streams
                    .iter()
                    .filter(|entry| entry.is_selected())
                    .map(|entry| entry.name().to_string())
                    .collect(),
            ),
        }
    }

    /// Select exactly the named streams
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Streams(names.into_iter().map(Into::into).collect())
    }

    /// Check if a stream is selected
    pub fn includes(&self, stream: &str) -> bool {
        match self {
            Self::All => true,
            Self::Streams(names) => names.contains(stream),
        }
    }
}
