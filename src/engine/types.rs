//! Engine types
//!
//! Configuration, per-stream outcomes and run statistics for the sync engine.

use crate::pagination::DEFAULT_PAGE_SIZE;
use chrono::{DateTime, Utc};

/// Configuration for sync operation
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Elements requested per page
    pub page_size: u32,
    /// Starting point for incremental streams without a watermark
    pub start_date: Option<DateTime<Utc>>,
    /// Restrict project-scoped streams to these projects
    pub project_ids: Option<Vec<i64>>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            start_date: None,
            project_ids: None,
        }
    }
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page size
    #[must_use]
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Set the start date
    #[must_use]
    pub fn with_start_date(mut self, start_date: Option<DateTime<Utc>>) -> Self {
        self.start_date = start_date;
        self
    }

    /// Set the project filter
    #[must_use]
    pub fn with_project_ids(mut self, ids: Option<Vec<i64>>) -> Self {
        self.project_ids = ids.filter(|ids| !ids.is_empty());
        self
    }
}

/// How a stream run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// Every page was read
    Completed,
    /// The API refused access; counted as success with what was read
    PermissionDenied,
}

/// Result of one stream (or one partition) run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOutcome {
    /// How the run ended
    pub status: StreamStatus,
    /// Records emitted
    pub records: usize,
    /// Pages fetched
    pub pages: usize,
}

impl StreamOutcome {
    /// A completed run with nothing read yet
    pub fn new() -> Self {
        Self {
            status: StreamStatus::Completed,
            records: 0,
            pages: 0,
        }
    }

    /// Fold a partition outcome into this one
    pub fn merge(&mut self, other: StreamOutcome) {
        self.records += other.records;
        self.pages += other.pages;
        if other.status == StreamStatus::PermissionDenied {
            self.status = StreamStatus::PermissionDenied;
        }
    }
}

impl Default for StreamOutcome {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics from a sync operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Total records synced
    pub records_synced: usize,
    /// Total pages fetched
    pub pages_fetched: usize,
    /// Total streams synced
    pub streams_synced: usize,
    /// Total partitions synced
    pub partitions_synced: usize,
    /// Streams skipped because access was denied
    pub streams_denied: usize,
    /// Errors encountered
    pub errors: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records
    pub fn add_records(&mut self, count: usize) {
        self.records_synced += count;
    }

    /// Add a page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    /// Add a stream
    pub fn add_stream(&mut self) {
        self.streams_synced += 1;
    }

    /// Add a partition
    pub fn add_partition(&mut self) {
        self.partitions_synced += 1;
    }

    /// Add a denied stream
    pub fn add_denied(&mut self) {
        self.streams_denied += 1;
    }

    /// Add an error
    pub fn add_error(&mut self) {
        self.errors += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
