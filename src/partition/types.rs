//! Parent context types

use crate::types::{JsonObject, JsonValue};
use serde_json::Value;
use std::collections::HashSet;

/// Context values one parent record supplies to its child stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParentContext {
    /// Unique identifier for this context (the parent id)
    pub id: String,
    /// Values injected into the child path and records
    pub values: JsonObject,
}

impl ParentContext {
    /// Create a new context
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: JsonObject::new(),
        }
    }

    /// Add a value to the context
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.values.get(key)
    }

    /// Copy all context values into a child record
    pub fn apply_to(&self, record: &mut JsonObject) {
        for (key, value) in &self.values {
            record.insert(key.clone(), value.clone());
        }
    }
}

/// How a child stream hangs off its parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRelation {
    /// Name of the parent stream
    pub stream: String,
    /// Parent record field holding the id
    pub id_field: String,
    /// Parent record field holding the display title
    pub title_field: String,
    /// Prefix of the context keys (`<prefix>_id`, `<prefix>_title`)
    pub prefix: String,
}

impl ParentRelation {
    /// Create a new relation
    pub fn new(
        stream: impl Into<String>,
        id_field: impl Into<String>,
        title_field: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            stream: stream.into(),
            id_field: id_field.into(),
            title_field: title_field.into(),
            prefix: prefix.into(),
        }
    }

    /// Context key carrying the parent id
    pub fn id_key(&self) -> String {
        format!("{}_id", self.prefix)
    }

    /// Context key carrying the parent title
    pub fn title_key(&self) -> String {
        format!("{}_title", self.prefix)
    }

    /// Build the context for one parent record.
    ///
    /// Returns `None` when the record has no usable id.
    pub fn context_for(&self, record: &JsonObject) -> Option<ParentContext> {
        let id = record.get(&self.id_field)?;
        let id_string = match id {
            Value::Number(n) => n.to_string(),
            Value::String(s) if !s.is_empty() => s.clone(),
            _ => return None,
        };
        let title = record.get(&self.title_field).cloned().unwrap_or(Value::Null);

        Some(
            ParentContext::new(id_string)
                .with_value(self.id_key(), id.clone())
                .with_value(self.title_key(), title),
        )
    }
}

/// Collects child contexts from parent records
#[derive(Debug, Clone)]
pub struct ParentRouter {
    relation: ParentRelation,
    contexts: Vec<ParentContext>,
    seen: HashSet<String>,
}

impl ParentRouter {
    /// Create an empty router for a relation
    pub fn new(relation: ParentRelation) -> Self {
        Self {
            relation,
            contexts: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// The relation this router collects for
    pub fn relation(&self) -> &ParentRelation {
        &self.relation
    }

    /// Record a parent record; duplicate parent ids are ignored
    pub fn observe(&mut self, record: &JsonObject) {
        if let Some(context) = self.relation.context_for(record) {
            if self.seen.insert(context.id.clone()) {
                self.contexts.push(context);
            }
        }
    }

    /// Collected contexts in parent order
    pub fn partitions(&self) -> &[ParentContext] {
        &self.contexts
    }

    /// Consume the router, returning its contexts
    pub fn into_partitions(self) -> Vec<ParentContext> {
        self.contexts
    }

    /// Number of collected contexts
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Check if no context was collected
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
