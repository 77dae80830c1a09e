//! Output module
//!
//! Singer messages and the sinks they are written to.
//!
//! # Overview
//!
//! This module provides:
//! - [`Message`] - the SCHEMA / RECORD / STATE message kinds
//! - [`MessageSink`] - where a sync run emits its messages
//! - [`JsonLinesSink`] - one JSON object per line, normally on stdout
//! - [`MemorySink`] - collects messages for embedding callers and tests

mod message;
mod writer;

pub use message::Message;
pub use writer::{JsonLinesSink, MemorySink, MessageSink};

#[cfg(test)]
mod tests;
