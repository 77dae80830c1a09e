//! State types for tracking sync progress
//!
//! State is a flat JSON object: one replication watermark per incremental
//! stream plus the `last_sync` timestamp of the previous run. Keys this tap
//! does not recognize are carried through untouched.

use crate::filter::parse_datetime;
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Complete replication state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Completion time of the last successful run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<String>,

    /// Watermarks keyed by stream name, plus any pass-through keys
    #[serde(flatten)]
    pub bookmarks: BTreeMap<String, JsonValue>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Watermark recorded for a stream, if it is a string
    pub fn watermark(&self, stream: &str) -> Option<&str> {
        self.bookmarks.get(stream)?.as_str()
    }

    /// Raise the watermark of `stream` to `candidate` if it is higher.
    ///
    /// Values are compared as datetimes when both parse, otherwise as
    /// strings. Returns `true` when the watermark moved.
    pub fn advance_watermark(&mut self, stream: &str, candidate: &str) -> bool {
        let newer = match self.watermark(stream) {
            Some(current) => compare_watermarks(candidate, current) == Ordering::Greater,
            None => true,
        };
        if newer {
            self.bookmarks
                .insert(stream.to_string(), JsonValue::String(candidate.to_string()));
        }
        newer
    }

    /// Check if the state carries nothing
    pub fn is_empty(&self) -> bool {
        self.last_sync.is_none() && self.bookmarks.is_empty()
    }

    /// State as a JSON value, as emitted in STATE messages
    pub fn to_value(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Order two watermark values
pub fn compare_watermarks(a: &str, b: &str) -> Ordering {
    match (parse_datetime(a), parse_datetime(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}
