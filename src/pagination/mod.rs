//! Pagination module
//!
//! OpenProject collections are paged by offset: each HAL page reports its
//! `total`, `pageSize` and `offset`, and carries a `nextByOffset` link while
//! more pages exist.
//!
//! # Overview
//!
//! A [`Paginator`] turns the current [`PaginationState`] into query
//! parameters and inspects each page to decide whether another request is
//! needed. The page cursor starts undefined (no `offset` parameter on the
//! first request) and becomes undefined again once `nextOffset >= total`.

mod strategies;
mod types;

pub use strategies::{HalOffsetPaginator, DEFAULT_PAGE_SIZE};
pub use types::{NextPage, PaginationState, Paginator};
