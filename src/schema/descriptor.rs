//! Typed field descriptors for stream schemas

use super::types::{JsonSchema, JsonType, SchemaProperty};
use crate::error::{Error, Result};
use crate::types::JsonObject;
use std::collections::{BTreeMap, HashSet};

/// Semantic type of a stream field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// Calendar date (`YYYY-MM-DD`)
    Date,
    /// ISO-8601 timestamp
    DateTime,
    /// ISO-8601 duration (`PT2H30M`)
    Duration,
    /// OpenProject rich text: `{format, raw, html}`
    Formattable,
    /// Object with declared properties
    Object(Vec<Field>),
    /// Object with free-form contents
    AnyObject,
    /// Array of the inner type
    Array(Box<FieldType>),
}

impl FieldType {
    /// Array of `inner`
    pub fn array_of(inner: FieldType) -> Self {
        FieldType::Array(Box::new(inner))
    }

    fn to_property(&self, nullable: bool) -> SchemaProperty {
        match self {
            FieldType::String => SchemaProperty::new(JsonType::String, nullable),
            FieldType::Integer => SchemaProperty::new(JsonType::Integer, nullable),
            FieldType::Number => SchemaProperty::new(JsonType::Number, nullable),
            FieldType::Boolean => SchemaProperty::new(JsonType::Boolean, nullable),
            FieldType::Date => SchemaProperty::new(JsonType::String, nullable).with_format("date"),
            FieldType::DateTime => {
                SchemaProperty::new(JsonType::String, nullable).with_format("date-time")
            }
            FieldType::Duration => {
                SchemaProperty::new(JsonType::String, nullable).with_format("duration")
            }
            FieldType::Formattable => {
                let props = ["format", "raw", "html"]
                    .into_iter()
                    .map(|name| {
                        (
                            name.to_string(),
                            SchemaProperty::new(JsonType::String, true),
                        )
                    })
                    .collect();
                SchemaProperty::new(JsonType::Object, nullable).with_properties(props)
            }
            FieldType::Object(fields) => {
                let props = fields
                    .iter()
                    .map(|f| (f.name.clone(), f.to_property()))
                    .collect::<BTreeMap<_, _>>();
                SchemaProperty::new(JsonType::Object, nullable).with_properties(props)
            }
            FieldType::AnyObject => SchemaProperty::new(JsonType::Object, nullable),
            FieldType::Array(inner) => SchemaProperty::new(JsonType::Array, nullable)
                .with_items(inner.to_property(true)),
        }
    }
}

/// A single named field of a stream
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Property name as it appears in emitted records
    pub name: String,
    /// Semantic type
    pub field_type: FieldType,
    /// Required fields are non-nullable in the rendered schema
    pub required: bool,
    /// Human-readable description
    pub description: Option<String>,
}

impl Field {
    /// Create an optional (nullable) field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            description: None,
        }
    }

    /// Mark the field as required
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Attach a description
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn to_property(&self) -> SchemaProperty {
        self.field_type
            .to_property(!self.required)
            .with_description(self.description.as_deref())
    }
}

/// Ordered field list of one stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSchema {
    fields: Vec<Field>,
}

impl StreamSchema {
    /// Create a schema from fields
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Append a field
    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// All fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check if a field is declared
    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Check the declared keys against the field list.
    ///
    /// Field names must be unique, `primary_keys` must be non-empty, and every
    /// key must be a declared field.
    pub fn validate(
        &self,
        stream: &str,
        primary_keys: &[String],
        replication_key: Option<&str>,
    ) -> Result<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(Error::schema(
                    stream,
                    format!("duplicate field '{}'", field.name),
                ));
            }
        }

        if primary_keys.is_empty() {
            return Err(Error::schema(stream, "no primary key declared"));
        }

        for key in primary_keys {
            if !self.contains(key) {
                return Err(Error::schema(
                    stream,
                    format!("primary key '{key}' is not a declared field"),
                ));
            }
        }

        if let Some(key) = replication_key {
            match self.field(key).map(|f| &f.field_type) {
                Some(FieldType::DateTime | FieldType::Date) => {}
                Some(other) => {
                    return Err(Error::schema(
                        stream,
                        format!("replication key '{key}' must be a date or datetime, got {other:?}"),
                    ))
                }
                None => {
                    return Err(Error::schema(
                        stream,
                        format!("replication key '{key}' is not a declared field"),
                    ))
                }
            }
        }

        Ok(())
    }

    /// Drop top-level properties that are not declared fields
    pub fn conform(&self, record: JsonObject) -> JsonObject {
        record
            .into_iter()
            .filter(|(key, _)| self.contains(key))
            .collect()
    }

    /// Render as a JSON Schema document
    pub fn to_json_schema(&self) -> JsonSchema {
        let mut schema = JsonSchema::new();
        for field in &self.fields {
            schema.add_property(&field.name, field.to_property());
            if field.required {
                schema.add_required(&field.name);
            }
        }
        schema
    }
}
