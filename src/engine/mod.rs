//! Execution engine module
//!
//! Pagination and replication driver shared by every stream.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - Drives one stream (or one stream per parent context)
//!   through its pages, flattening records and advancing watermarks
//! - `SyncConfig` - Page size, start date and project filter
//! - `StreamOutcome` / `SyncStats` - What a run produced
//!
//! A stream run starts by building its query: `pageSize`, plus for
//! incremental streams a `filters` constraint on the replication key and
//! ascending `sortBy`, plus the project filter for project-scoped streams.
//! Each page is fully flattened before any of its records is handed on.

mod types;

pub use types::{StreamOutcome, StreamStatus, SyncConfig, SyncStats};

use crate::error::{Error, Result};
use crate::filter::{parse_datetime, sort_ascending, FilterSet};
use crate::http::Fetcher;
use crate::pagination::{HalOffsetPaginator, PaginationState, Paginator};
use crate::partition::ParentContext;
use crate::state::StateManager;
use crate::streams::StreamDefinition;
use crate::types::{JsonObject, JsonValue};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Sync engine for driving streams against a page source
pub struct SyncEngine<F: Fetcher> {
    /// Page source
    fetcher: F,
    /// Sync configuration
    config: SyncConfig,
    /// Statistics
    stats: SyncStats,
}

impl<F: Fetcher> SyncEngine<F> {
    /// Create a new sync engine
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            config: SyncConfig::default(),
            stats: SyncStats::default(),
        }
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the sync configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Get mutable sync configuration
    pub fn config_mut(&mut self) -> &mut SyncConfig {
        &mut self.config
    }

    /// Get the page source
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Get mutable statistics
    pub fn stats_mut(&mut self) -> &mut SyncStats {
        &mut self.stats
    }

    /// Consume the engine, returning its statistics
    pub fn into_stats(self) -> SyncStats {
        self.stats
    }

    /// Query parameters shared by every page of a stream run
    pub fn base_query(
        &self,
        stream: &StreamDefinition,
        state: &StateManager,
    ) -> Result<Vec<(String, String)>> {
        let mut filters = FilterSet::new();
        let mut query = Vec::new();

        if let Some(key) = stream.replication_key.as_deref() {
            let start = match state.watermark(&stream.name) {
                Some(watermark) => Some(parse_datetime(watermark).map_err(|e| {
                    Error::validation(format!(
                        "invalid watermark for stream '{}': {e}",
                        stream.name
                    ))
                })?),
                None => self.config.start_date,
            };
            if let Some(start) = start {
                filters = filters.since(key, &start);
            }
            query.push(("sortBy".to_string(), sort_ascending(key)));
        }

        if let (Some(field), Some(ids)) = (&stream.project_filter, &self.config.project_ids) {
            filters = filters.any_of(field, ids);
        }

        if !filters.is_empty() {
            query.insert(0, ("filters".to_string(), filters.to_query_value()));
        }
        Ok(query)
    }

    /// Sync a single stream, or one parent context of a child stream.
    ///
    /// `on_record` receives every flattened record in page order. The
    /// stream's watermark is advanced after each record is handed on.
    pub async fn sync_stream<H>(
        &mut self,
        stream: &StreamDefinition,
        context: Option<&ParentContext>,
        state: &mut StateManager,
        on_record: &mut H,
    ) -> Result<StreamOutcome>
    where
        H: FnMut(JsonObject) -> Result<()>,
    {
        let start = Instant::now();
        let path = stream.path_for(context)?;
        let base_query = self.base_query(stream, state)?;
        let paginator = HalOffsetPaginator::new(self.config.page_size);
        let mut pagination = PaginationState::new();
        let mut outcome = StreamOutcome::new();

        debug!("Starting sync for stream {} at {}", stream.name, path);

        loop {
            let mut query = base_query.clone();
            query.extend(paginator.request_params(&pagination));

            let mut body = match self.fetcher.get_json(&path, &query).await {
                Ok(body) => body,
                Err(e) if stream.requires_elevated_access && e.is_permission_denied() => {
                    warn!(
                        "Access to stream {} was denied (HTTP 403); it requires elevated permissions, skipping",
                        stream.name
                    );
                    outcome.status = StreamStatus::PermissionDenied;
                    break;
                }
                Err(e) => {
                    self.stats.add_error();
                    return Err(e);
                }
            };

            let records = take_elements(&mut body, &path)?
                .into_iter()
                .map(|element| match element {
                    JsonValue::Object(raw) => Ok(stream.flatten(raw, context)),
                    other => Err(Error::malformed_body(format!(
                        "{path}: expected object elements, got {other}"
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;

            let record_count = records.len();
            outcome.pages += 1;
            self.stats.add_page();
            debug!(
                "Page {} of {}: fetched {} records",
                outcome.pages, stream.name, record_count
            );

            for record in records {
                let watermark = stream.replication_value(&record).map(String::from);
                on_record(record)?;
                outcome.records += 1;
                self.stats.add_records(1);
                if let Some(value) = watermark {
                    state.advance(&stream.name, &value);
                }
            }

            if paginator
                .process_response(&body, record_count, &mut pagination)
                .is_done()
            {
                break;
            }
        }

        debug!(
            "Completed {} in {}ms: {} records in {} pages",
            stream.name,
            start.elapsed().as_millis(),
            outcome.records,
            outcome.pages
        );
        Ok(outcome)
    }

    /// Sync a child stream once per parent context
    pub async fn sync_partitioned_stream<H>(
        &mut self,
        stream: &StreamDefinition,
        contexts: &[ParentContext],
        state: &mut StateManager,
        on_record: &mut H,
    ) -> Result<StreamOutcome>
    where
        H: FnMut(JsonObject) -> Result<()>,
    {
        info!(
            "Syncing {} for {} parent records",
            stream.name,
            contexts.len()
        );

        let mut outcome = StreamOutcome::new();
        for context in contexts {
            debug!("Processing partition {} of {}", context.id, stream.name);
            let partition = self
                .sync_stream(stream, Some(context), state, on_record)
                .await?;
            outcome.merge(partition);
            self.stats.add_partition();
        }
        Ok(outcome)
    }
}

impl<F: Fetcher + std::fmt::Debug> std::fmt::Debug for SyncEngine<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("fetcher", &self.fetcher)
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish()
    }
}

/// Take `_embedded.elements` out of a page; absent means an empty page
fn take_elements(body: &mut JsonValue, path: &str) -> Result<Vec<JsonValue>> {
    if !body.is_object() {
        return Err(Error::malformed_body(format!(
            "{path}: expected a JSON object page"
        )));
    }
    match body.pointer_mut("/_embedded/elements").map(JsonValue::take) {
        None | Some(JsonValue::Null) => Ok(Vec::new()),
        Some(JsonValue::Array(elements)) => Ok(elements),
        Some(other) => Err(Error::malformed_body(format!(
            "{path}: _embedded.elements is not an array: {other}"
        ))),
    }
}
