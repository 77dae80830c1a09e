//! Pagination strategy implementations

use super::types::{NextPage, PaginationState, Paginator};
use serde_json::Value;

/// Default number of elements requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// HAL offset pagination as served by OpenProject API v3.
///
/// Requests carry `pageSize` and, after the first page, `offset`. The next
/// offset is `offset + pageSize` taken from the page metadata (falling back
/// to the current cursor and the element count), and only while the page
/// advertises a `nextByOffset` link and the next offset is below `total`.
#[derive(Debug, Clone)]
pub struct HalOffsetPaginator {
    /// Query parameter name for offset
    pub offset_param: String,
    /// Query parameter name for page size
    pub page_size_param: String,
    /// Requested page size
    pub page_size: u32,
}

impl HalOffsetPaginator {
    /// Create a new paginator requesting `page_size` elements per page
    pub fn new(page_size: u32) -> Self {
        Self {
            offset_param: "offset".to_string(),
            page_size_param: "pageSize".to_string(),
            page_size,
        }
    }
}

impl Default for HalOffsetPaginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator for HalOffsetPaginator {
    fn request_params(&self, state: &PaginationState) -> Vec<(String, String)> {
        let mut params = vec![(self.page_size_param.clone(), self.page_size.to_string())];
        if let Some(offset) = state.offset {
            params.push((self.offset_param.clone(), offset.to_string()));
        }
        params
    }

    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_page(records_count as u64);

        if body.pointer("/_links/nextByOffset").is_none() {
            state.mark_done();
            return NextPage::Done;
        }

        let total = body.get("total").and_then(Value::as_u64).unwrap_or(0);
        let page_size = body
            .get("pageSize")
            .and_then(Value::as_u64)
            .unwrap_or(records_count as u64);
        let current_offset = body
            .get("offset")
            .and_then(Value::as_u64)
            .or(state.offset)
            .unwrap_or(0);

        // A zero page size would request the same page forever
        if page_size == 0 {
            state.mark_done();
            return NextPage::Done;
        }

        match current_offset.checked_add(page_size) {
            Some(next_offset) if next_offset < total => {
                state.set_offset(next_offset);
                NextPage::Continue
            }
            _ => {
                state.mark_done();
                NextPage::Done
            }
        }
    }
}
