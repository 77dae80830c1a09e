//! Message sinks
//!
//! Provides the line-delimited JSON writer used on stdout and an in-memory
//! collector.

use super::message::Message;
use crate::error::{Error, Result};
use crate::types::JsonObject;
use std::io::{BufWriter, Stdout, Write};

/// Destination of the messages of a sync run
pub trait MessageSink {
    /// Emit one message
    fn emit(&mut self, message: &Message) -> Result<()>;

    /// Flush buffered output
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes one JSON object per line
pub struct JsonLinesSink<W: Write> {
    writer: W,
    messages_written: usize,
}

impl JsonLinesSink<BufWriter<Stdout>> {
    /// Sink writing to stdout
    pub fn stdout() -> Self {
        Self::new(BufWriter::new(std::io::stdout()))
    }
}

impl<W: Write> JsonLinesSink<W> {
    /// Create a sink around a writer
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            messages_written: 0,
        }
    }

    /// Get the number of messages written so far
    #[must_use]
    pub fn messages_written(&self) -> usize {
        self.messages_written
    }

    /// Consume the sink, returning the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> MessageSink for JsonLinesSink<W> {
    fn emit(&mut self, message: &Message) -> Result<()> {
        serde_json::to_writer(&mut self.writer, message)
            .map_err(|e| Error::output(format!("Failed to write message: {e}")))?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| Error::output(format!("Failed to write message: {e}")))?;
        self.messages_written += 1;

        // Downstream targets checkpoint on STATE
        if message.is_state() {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| Error::output(format!("Failed to flush output: {e}")))
    }
}

impl<W: Write> std::fmt::Debug for JsonLinesSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink")
            .field("messages_written", &self.messages_written)
            .finish_non_exhaustive()
    }
}

/// Collects messages in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    messages: Vec<Message>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All collected messages in emission order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Consume the sink, returning the messages
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Records emitted for `stream`
    pub fn records(&self, stream: &str) -> Vec<&JsonObject> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Record {
                    stream: s, record, ..
                } if s == stream => Some(record),
                _ => None,
            })
            .collect()
    }

    /// Streams that received a schema message, in order
    pub fn schema_streams(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|m| m.is_schema())
            .filter_map(Message::stream)
            .collect()
    }

    /// Last state message value
    pub fn last_state(&self) -> Option<&serde_json::Value> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::State { value } => Some(value),
            _ => None,
        })
    }
}

impl MessageSink for MemorySink {
    fn emit(&mut self, message: &Message) -> Result<()> {
        self.messages.push(message.clone());
        Ok(())
    }
}
