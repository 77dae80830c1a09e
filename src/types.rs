//! Common types used throughout the tap
//!
//! Shared type aliases and small enums used across multiple modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Replication Method
// ============================================================================

/// How a stream is replicated between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicationMethod {
    /// Every run re-reads the whole stream
    #[default]
    FullTable,
    /// Only records at or after the stored watermark are read
    Incremental,
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Error Handling Strategy
// ============================================================================

/// What a failing stream does to the rest of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamErrorPolicy {
    /// Abort the whole run on the first stream failure
    #[default]
    FailRun,
    /// Log the failure, continue with the remaining streams, fail at the end
    SkipStream,
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty or whitespace
    fn none_if_blank(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_blank(self) -> Option<String> {
        self.filter(|s| !s.trim().is_empty())
    }
}
