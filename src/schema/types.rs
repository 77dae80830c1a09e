//! Rendered JSON Schema types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSON Schema type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonType::String => write!(f, "string"),
            JsonType::Number => write!(f, "number"),
            JsonType::Integer => write!(f, "integer"),
            JsonType::Boolean => write!(f, "boolean"),
            JsonType::Object => write!(f, "object"),
            JsonType::Array => write!(f, "array"),
            JsonType::Null => write!(f, "null"),
        }
    }
}

/// JSON type can be a single type or array of types (for nullable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonTypeOrArray {
    Single(JsonType),
    Multiple(Vec<JsonType>),
}

impl JsonTypeOrArray {
    /// Single type, or `[type, "null"]` when nullable
    pub fn of(t: JsonType, nullable: bool) -> Self {
        if nullable && t != JsonType::Null {
            JsonTypeOrArray::Multiple(vec![t, JsonType::Null])
        } else {
            JsonTypeOrArray::Single(t)
        }
    }

    /// Check if this type is nullable
    pub fn is_nullable(&self) -> bool {
        match self {
            JsonTypeOrArray::Single(JsonType::Null) => true,
            JsonTypeOrArray::Multiple(types) => types.contains(&JsonType::Null),
            JsonTypeOrArray::Single(_) => false,
        }
    }

    /// Get the primary (non-null) type
    pub fn primary_type(&self) -> Option<&JsonType> {
        match self {
            JsonTypeOrArray::Single(t) => Some(t),
            JsonTypeOrArray::Multiple(types) => types.iter().find(|t| **t != JsonType::Null),
        }
    }
}

/// JSON Schema property definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaProperty {
    /// Property type(s)
    #[serde(rename = "type")]
    pub json_type: JsonTypeOrArray,

    /// Description (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Format hint (e.g., "date-time", "date", "duration")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Nested properties (for objects)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, SchemaProperty>>,

    /// Array items schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaProperty>>,
}

impl SchemaProperty {
    /// Create a property with the given type
    pub fn new(json_type: JsonType, nullable: bool) -> Self {
        Self {
            json_type: JsonTypeOrArray::of(json_type, nullable),
            description: None,
            format: None,
            properties: None,
            items: None,
        }
    }

    /// Set format hint
    #[must_use]
    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    /// Set description
    #[must_use]
    pub fn with_description(mut self, description: Option<&str>) -> Self {
        self.description = description.map(String::from);
        self
    }

    /// Set nested object properties
    #[must_use]
    pub fn with_properties(mut self, properties: BTreeMap<String, SchemaProperty>) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Set array item schema
    #[must_use]
    pub fn with_items(mut self, items: SchemaProperty) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    /// Check if nullable
    pub fn is_nullable(&self) -> bool {
        self.json_type.is_nullable()
    }
}

/// Full JSON Schema document for one stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema {
    /// Schema type (always "object" for top-level)
    #[serde(rename = "type")]
    pub json_type: JsonType,

    /// Object properties
    #[serde(default)]
    pub properties: BTreeMap<String, SchemaProperty>,

    /// Required properties
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl Default for JsonSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonSchema {
    /// Create a new empty object schema
    pub fn new() -> Self {
        Self {
            json_type: JsonType::Object,
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Add a property
    pub fn add_property(&mut self, name: &str, property: SchemaProperty) {
        self.properties.insert(name.to_string(), property);
    }

    /// Add a required property
    pub fn add_required(&mut self, name: &str) {
        if !self.required.iter().any(|n| n == name) {
            self.required.push(name.to_string());
        }
    }

    /// Get a property
    pub fn get_property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.get(name)
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
