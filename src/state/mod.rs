//! State management module
//!
//! Handles replication watermarks between sync runs to enable incremental
//! syncs.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - flat watermark map plus `last_sync`
//! - `StateManager` - loading from file or JSON and watermark updates

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{compare_watermarks, State};
