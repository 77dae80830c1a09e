//! Singer message types

use crate::streams::StreamDefinition;
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};

/// A message emitted during sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Stream schema, sent once before the stream's first record
    Schema {
        /// Stream name
        stream: String,
        /// JSON schema of the records
        schema: JsonValue,
        /// Primary key fields
        key_properties: Vec<String>,
        /// Replication key fields
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        bookmark_properties: Vec<String>,
    },
    /// One record
    Record {
        /// Stream name
        stream: String,
        /// Flattened record
        record: JsonObject,
        /// Extraction time (RFC 3339)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_extracted: Option<String>,
    },
    /// Full state snapshot
    State {
        /// State document
        value: JsonValue,
    },
}

impl Message {
    /// Create the schema message for a stream
    pub fn schema(stream: &StreamDefinition) -> Self {
        Self::Schema {
            stream: stream.name.clone(),
            schema: stream.schema().to_json_schema().to_json(),
            key_properties: stream.primary_keys.clone(),
            bookmark_properties: stream.replication_key.iter().cloned().collect(),
        }
    }

    /// Create a record message
    pub fn record(
        stream: impl Into<String>,
        record: JsonObject,
        time_extracted: Option<String>,
    ) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted,
        }
    }

    /// Create a state message
    pub fn state(value: JsonValue) -> Self {
        Self::State { value }
    }

    /// Stream the message belongs to, if any
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Schema { stream, .. } | Self::Record { stream, .. } => Some(stream),
            Self::State { .. } => None,
        }
    }

    /// Check if this is a schema message
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }
}
