//! Stream definition type
//!
//! One [`StreamDefinition`] per OpenProject resource. It carries the static
//! rules the sync engine needs: where to fetch, which keys identify and
//! order records, and how HAL links are flattened into top-level fields.

use crate::error::{Error, Result};
use crate::links::{resolve_link, resolve_link_array};
use crate::partition::{ParentContext, ParentRelation};
use crate::schema::{Field, FieldType, StreamSchema};
use crate::template;
use crate::types::{JsonObject, JsonValue, ReplicationMethod};

/// A `_links` entry flattened into `<prefix>_id` / `<prefix>_title`, or for
/// link arrays into `<prefix>_ids` / `<prefix>_titles`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkField {
    /// Key inside `_links`
    pub link: String,
    /// Prefix of the output fields
    pub prefix: String,
}

impl LinkField {
    /// Create a link rule
    pub fn new(link: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            prefix: prefix.into(),
        }
    }
}

/// Static description of one stream
#[derive(Debug, Clone)]
pub struct StreamDefinition {
    /// Stream name
    pub name: String,
    /// Endpoint path below the API root, may contain parent placeholders
    pub endpoint: String,
    /// Fields forming the record key
    pub primary_keys: Vec<String>,
    /// Field driving incremental replication
    pub replication_key: Option<String>,
    /// Link entries flattened to id/title pairs
    pub links: Vec<LinkField>,
    /// Link array entries flattened to id/title lists
    pub link_arrays: Vec<LinkField>,
    /// Parent stream supplying path and record context
    pub parent: Option<ParentRelation>,
    /// HTTP 403 yields an empty stream instead of an error
    pub requires_elevated_access: bool,
    /// Filter field restricting the stream to the configured projects
    pub project_filter: Option<String>,
    schema: StreamSchema,
}

impl StreamDefinition {
    /// Create a definition keyed by `id`
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            primary_keys: vec!["id".to_string()],
            replication_key: None,
            links: Vec::new(),
            link_arrays: Vec::new(),
            parent: None,
            requires_elevated_access: false,
            project_filter: None,
            schema: StreamSchema::new(fields),
        }
    }

    /// Replace the primary key fields
    #[must_use]
    pub fn with_primary_keys(mut self, keys: &[&str]) -> Self {
        self.primary_keys = keys.iter().map(ToString::to_string).collect();
        self
    }

    /// Replicate incrementally on `key`
    #[must_use]
    pub fn with_replication_key(mut self, key: impl Into<String>) -> Self {
        self.replication_key = Some(key.into());
        self
    }

    /// Flatten `_links.<link>` into `<prefix>_id` and `<prefix>_title`
    #[must_use]
    pub fn with_link(mut self, link: &str, prefix: &str) -> Self {
        self.declare(Field::new(format!("{prefix}_id"), FieldType::Integer));
        self.declare(Field::new(format!("{prefix}_title"), FieldType::String));
        self.links.push(LinkField::new(link, prefix));
        self
    }

    /// Flatten several links whose prefix equals the link key
    #[must_use]
    pub fn with_links(self, links: &[&str]) -> Self {
        links.iter().fold(self, |def, link| def.with_link(link, link))
    }

    /// Flatten the link array `_links.<link>` into `<prefix>_ids` and
    /// `<prefix>_titles`
    #[must_use]
    pub fn with_link_array(mut self, link: &str, prefix: &str) -> Self {
        self.declare(Field::new(
            format!("{prefix}_ids"),
            FieldType::array_of(FieldType::Integer),
        ));
        self.declare(Field::new(
            format!("{prefix}_titles"),
            FieldType::array_of(FieldType::String),
        ));
        self.link_arrays.push(LinkField::new(link, prefix));
        self
    }

    /// Make this a child of `relation.stream`
    #[must_use]
    pub fn with_parent(mut self, relation: ParentRelation) -> Self {
        self.declare(Field::new(relation.id_key(), FieldType::Integer));
        self.declare(Field::new(relation.title_key(), FieldType::String));
        self.parent = Some(relation);
        self
    }

    /// Treat HTTP 403 as an empty stream
    #[must_use]
    pub fn requires_elevated_access(mut self) -> Self {
        self.requires_elevated_access = true;
        self
    }

    /// Restrict to configured projects through the `field` filter
    #[must_use]
    pub fn with_project_filter(mut self, field: impl Into<String>) -> Self {
        self.project_filter = Some(field.into());
        self
    }

    fn declare(&mut self, field: Field) {
        if !self.schema.contains(&field.name) {
            self.schema.push(field);
        }
    }

    /// Record schema including the derived link and parent fields
    pub fn schema(&self) -> &StreamSchema {
        &self.schema
    }

    /// Replication method implied by the replication key
    pub fn replication_method(&self) -> ReplicationMethod {
        if self.replication_key.is_some() {
            ReplicationMethod::Incremental
        } else {
            ReplicationMethod::FullTable
        }
    }

    /// Check if the stream replicates incrementally
    pub fn is_incremental(&self) -> bool {
        self.replication_key.is_some()
    }

    /// Check if the stream depends on a parent stream
    pub fn is_child(&self) -> bool {
        self.parent.is_some()
    }

    /// Check the definition for consistency
    pub fn validate(&self) -> Result<()> {
        self.schema.validate(
            &self.name,
            &self.primary_keys,
            self.replication_key.as_deref(),
        )?;

        let variables = template::extract_variables(&self.endpoint);
        match &self.parent {
            Some(relation) => {
                let id_key = relation.id_key();
                if let Some(unknown) = variables.iter().find(|v| **v != id_key) {
                    return Err(Error::schema(
                        &self.name,
                        format!("endpoint placeholder '{{{unknown}}}' is not supplied by parent '{}'", relation.stream),
                    ));
                }
                if self.is_incremental() {
                    return Err(Error::schema(
                        &self.name,
                        "child streams resync per parent and cannot be incremental",
                    ));
                }
            }
            None if !variables.is_empty() => {
                return Err(Error::schema(
                    &self.name,
                    "endpoint has placeholders but no parent stream",
                ));
            }
            None => {}
        }

        Ok(())
    }

    /// Request path, with parent placeholders filled from `context`
    pub fn path_for(&self, context: Option<&ParentContext>) -> Result<String> {
        match context {
            Some(ctx) => template::render(&self.endpoint, &ctx.values),
            None if template::has_placeholders(&self.endpoint) => Err(Error::schema(
                &self.name,
                "child stream requested without parent context",
            )),
            None => Ok(self.endpoint.clone()),
        }
    }

    /// Turn one raw HAL element into an output record.
    ///
    /// Adds the flattened link fields and parent context, then drops every
    /// property the schema does not declare (including `_links`).
    pub fn flatten(&self, mut raw: JsonObject, context: Option<&ParentContext>) -> JsonObject {
        let links = raw.remove("_links");

        for rule in &self.links {
            resolve_link(links.as_ref(), &rule.link).write_into(&mut raw, &rule.prefix);
        }

        for rule in &self.link_arrays {
            let (ids, titles) = resolve_link_array(links.as_ref(), &rule.link);
            raw.insert(format!("{}_ids", rule.prefix), JsonValue::from(ids));
            raw.insert(format!("{}_titles", rule.prefix), JsonValue::from(titles));
        }

        if let Some(ctx) = context {
            ctx.apply_to(&mut raw);
        }

        self.schema.conform(raw)
    }

    /// Replication key value of a record, when it is a string
    pub fn replication_value<'a>(&self, record: &'a JsonObject) -> Option<&'a str> {
        record.get(self.replication_key.as_deref()?)?.as_str()
    }
}
