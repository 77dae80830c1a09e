//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by the driver.

use serde_json::Value;

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// More pages available; the next request is described by the state
    Continue,
    /// No more pages
    Done,
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Check if this is a continue result
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

/// Tracks pagination state during one stream run
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Offset of the next request; `None` before the first page
    pub offset: Option<u64>,
    /// Pages processed so far
    pub pages: u32,
    /// Total records fetched so far
    pub total_fetched: u64,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark pagination as complete and clear the cursor
    pub fn mark_done(&mut self) {
        self.offset = None;
        self.done = true;
    }

    /// Set the offset for the next request
    pub fn set_offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    /// Account for one processed page
    pub fn add_page(&mut self, records: u64) {
        self.pages += 1;
        self.total_fetched += records;
    }
}

/// Core trait for pagination strategies
pub trait Paginator: Send + Sync {
    /// Query parameters for the request described by `state`
    fn request_params(&self, state: &PaginationState) -> Vec<(String, String)>;

    /// Process a response page and determine if there's a next page
    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage;
}
