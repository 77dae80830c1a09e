//! Stream definitions
//!
//! Every OpenProject resource the tap extracts is described by a
//! [`StreamDefinition`]: endpoint, keys, schema and the HAL link flattening
//! rules. The sync engine is generic over these definitions.
//!
//! Streams are declared in a fixed order; [`all_streams`] returns them in
//! that order and output always follows it.

mod definition;
mod registry;

pub use definition::{LinkField, StreamDefinition};
pub use registry::{
    all_streams, attachments, memberships, priorities, projects, relations, roles, statuses,
    time_entries, types, users, validate_streams, versions, work_packages,
};

#[cfg(test)]
mod tests;
