//! Stream schema module
//!
//! Streams declare their fields with static, typed descriptors
//! ([`StreamSchema`]) which are validated once at startup and rendered to
//! JSON Schema ([`JsonSchema`]) for SCHEMA messages and the catalog.
//!
//! # Features
//!
//! - **Typed fields**: string, integer, number, boolean, date, date-time,
//!   duration, objects, arrays and OpenProject formattable text
//! - **Startup validation**: primary and replication keys must be declared
//! - **Record conforming**: undeclared properties are dropped before emission

mod descriptor;
mod types;

pub use descriptor::{Field, FieldType, StreamSchema};
pub use types::{JsonSchema, JsonType, JsonTypeOrArray, SchemaProperty};

#[cfg(test)]
mod tests;
