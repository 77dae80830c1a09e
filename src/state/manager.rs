//! State manager implementation
//!
//! Loads the state handed over by the previous run and tracks watermark
//! updates during this one.

use super::types::State;
use crate::error::{Error, Result};
use crate::filter::format_datetime;
use crate::types::JsonValue;
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, warn};

/// Owns the replication state of one run
#[derive(Debug, Clone, Default)]
pub struct StateManager {
    state: State,
}

impl StateManager {
    /// Create a manager around an existing state
    pub fn new(state: State) -> Self {
        Self { state }
    }

    /// Create a manager with empty state
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load state from a file.
    ///
    /// A missing file is not an error: the run starts from empty state.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(
                "State file {} not found, starting from empty state",
                path.display()
            );
            return Ok(Self::in_memory());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| Error::State {
            message: format!("Failed to read state file {}: {e}", path.display()),
        })?;
        let manager = Self::from_json(&contents)?;
        debug!(
            "Loaded state for {} keys from {}",
            manager.state.bookmarks.len(),
            path.display()
        );
        Ok(manager)
    }

    /// Create a state manager from inline JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::in_memory());
        }
        let state: State = serde_json::from_str(json).map_err(|e| Error::State {
            message: format!("Failed to parse state JSON: {e}"),
        })?;
        Ok(Self::new(state))
    }

    /// Get a read reference to the current state
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Consume the manager, returning the state
    pub fn into_state(self) -> State {
        self.state
    }

    /// Get the watermark for a stream
    pub fn watermark(&self, stream: &str) -> Option<&str> {
        self.state.watermark(stream)
    }

    /// Raise the watermark for a stream; lower values are ignored
    pub fn advance(&mut self, stream: &str, value: &str) -> bool {
        self.state.advance_watermark(stream, value)
    }

    /// Stamp the completion time of this run
    pub fn mark_synced(&mut self, at: DateTime<Utc>) {
        self.state.last_sync = Some(format_datetime(&at));
    }

    /// Current state as emitted in STATE messages
    pub fn snapshot(&self) -> JsonValue {
        self.state.to_value()
    }
}
