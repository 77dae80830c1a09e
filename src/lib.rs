//! # tap-openproject
//!
//! A Singer tap that extracts OpenProject entities through the HAL/JSON
//! API v3 and emits them as schema-tagged records plus replication state.
//!
//! ## Features
//!
//! - **Twelve streams**: projects, work packages, users, time entries and
//!   the reference data around them
//! - **Link flattening**: HAL `_links` become `<name>_id` / `<name>_title`
//!   columns
//! - **Incremental sync**: `updatedAt` watermarks pushed down as API filters
//! - **Resilient HTTP**: retries with exponential backoff, `Retry-After`,
//!   optional client-side rate limiting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tap_openproject::{JsonLinesSink, Selection, StateManager, Tap, TapConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> tap_openproject::Result<()> {
//!     let config = TapConfig::from_file("config.json")?;
//!     let state = StateManager::from_file("state.json")?;
//!
//!     let tap = Tap::new(config, state)?;
//!     let mut sink = JsonLinesSink::stdout();
//!     let stats = tap.run(&Selection::All, &mut sink).await?;
//!     eprintln!("synced {} records", stats.records_synced);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Tap                                 │
//! │  discover() → Catalog     run(selection, sink) → SyncStats   │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//! ┌───────────┬─────────────────┴─┬──────────────┬──────────────┐
//! │   HTTP    │      Engine       │   Streams    │   Output     │
//! ├───────────┼───────────────────┼──────────────┼──────────────┤
//! │ Basic auth│ HAL offset pages  │ Definitions  │ SCHEMA       │
//! │ Retry     │ Filters / sortBy  │ Link fields  │ RECORD       │
//! │ Rate limit│ Watermarks        │ Parent ctx   │ STATE        │
//! └───────────┴───────────────────┴──────────────┴──────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)] // TODO: Document error variant fields

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the tap
pub mod error;

/// Common types and type aliases
pub mod types;

/// HAL link resolution
pub mod links;

/// HTTP client with retry and rate limiting
pub mod http;

/// HAL offset pagination
pub mod pagination;

/// Parent contexts for child streams
pub mod partition;

/// API filter construction and datetime validation
pub mod filter;

/// Replication state
pub mod state;

/// Singer messages and sinks
pub mod output;

/// Stream execution engine
pub mod engine;

/// Tap configuration
pub mod config;

/// Stream definitions
pub mod streams;

/// Discovery catalog and stream selection
pub mod catalog;

/// Path templates
pub mod template;

/// Static stream schemas
pub mod schema;

/// Tap orchestrator
pub mod tap;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use catalog::{Catalog, Selection};
pub use config::TapConfig;
pub use engine::SyncStats;
pub use output::{JsonLinesSink, MemorySink, Message, MessageSink};
pub use state::StateManager;
pub use tap::Tap;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
