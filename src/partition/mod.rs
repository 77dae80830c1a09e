//! Parent/child partitioning
//!
//! A child stream (e.g. attachments) is requested once per parent record
//! (e.g. work package). Each parent record is turned into an explicit
//! [`ParentContext`] value that fills the child's endpoint placeholders and
//! is merged into every child record. Contexts are collected by a
//! [`ParentRouter`] while the parent stream runs and handed to the child
//! stream afterwards; no state is shared between the two.

mod types;

pub use types::{ParentContext, ParentRelation, ParentRouter};
