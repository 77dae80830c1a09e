//! Tap orchestrator
//!
//! Owns the stream definitions, the sync engine (and through it the HTTP
//! client) and the replication state for one run.
//!
//! A run resolves configured project identifiers, then walks the selected
//! streams in declaration order. Each stream gets a SCHEMA message, its
//! records, and a STATE message once it is drained. Child streams receive
//! their parent contexts from the parent's run, or from a silent pass over
//! the parent when the parent itself is not selected.

use crate::catalog::{Catalog, Selection};
use crate::config::TapConfig;
use crate::engine::{StreamOutcome, StreamStatus, SyncConfig, SyncEngine, SyncStats};
use crate::error::{Error, Result};
use crate::filter::format_datetime;
use crate::http::{Fetcher, HttpClient};
use crate::output::{Message, MessageSink};
use crate::partition::{ParentContext, ParentRelation, ParentRouter};
use crate::schema::{Field, FieldType};
use crate::state::StateManager;
use crate::streams::{all_streams, validate_streams, StreamDefinition};
use crate::types::{JsonObject, JsonValue, StreamErrorPolicy};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// One configured extraction run
pub struct Tap<F: Fetcher = HttpClient> {
    config: TapConfig,
    streams: Vec<StreamDefinition>,
    engine: SyncEngine<F>,
    state: StateManager,
}

impl Tap<HttpClient> {
    /// Create a tap talking to the configured OpenProject instance
    pub fn new(config: TapConfig, state: StateManager) -> Result<Self> {
        let client = HttpClient::with_config(config.http_config())?;
        Self::with_fetcher(config, client, state)
    }
}

impl<F: Fetcher> Tap<F> {
    /// Create a tap reading pages from `fetcher`
    pub fn with_fetcher(config: TapConfig, fetcher: F, state: StateManager) -> Result<Self> {
        let streams = all_streams();
        validate_streams(&streams)?;

        let sync_config = SyncConfig::new()
            .with_page_size(config.page_size)
            .with_start_date(config.start_date()?)
            .with_project_ids(config.project_ids.clone());

        Ok(Self {
            config,
            streams,
            engine: SyncEngine::new(fetcher).with_config(sync_config),
            state,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &TapConfig {
        &self.config
    }

    /// Stream definitions in declaration order
    pub fn streams(&self) -> &[StreamDefinition] {
        &self.streams
    }

    /// Get the replication state
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Build the discovery catalog
    pub fn discover(&self) -> Catalog {
        Catalog::discover(&self.streams)
    }

    /// Project ids the run is restricted to, if any
    pub fn project_ids(&self) -> Option<&[i64]> {
        self.engine.config().project_ids.as_deref()
    }

    // ========================================================================
    // Project identifiers
    // ========================================================================

    /// Resolve `project_identifiers` to ids when no `project_ids` are set.
    ///
    /// Failures degrade to a warning and leave the run unfiltered.
    pub async fn resolve_project_identifiers(&mut self) {
        if self.config.project_ids.is_some() {
            return;
        }
        let identifiers = match &self.config.project_identifiers {
            Some(identifiers) if !identifiers.is_empty() => identifiers.clone(),
            _ => return,
        };

        match self.lookup_project_ids(&identifiers).await {
            Ok(ids) if ids.is_empty() => {
                warn!("No project identifier could be resolved; syncing all projects");
            }
            Ok(ids) => {
                info!("Resolved project identifiers to ids {:?}", ids);
                self.engine.config_mut().project_ids = Some(ids.clone());
                self.config.project_ids = Some(ids);
            }
            Err(e) => {
                warn!("Failed to resolve project identifiers: {e}; syncing all projects");
            }
        }
    }

    async fn lookup_project_ids(&mut self, identifiers: &[String]) -> Result<Vec<i64>> {
        let lookup = project_lookup();
        let mut scratch = StateManager::in_memory();
        let mut by_identifier = HashMap::new();
        let stats = self.engine.stats().clone();

        let result = self
            .engine
            .sync_stream(&lookup, None, &mut scratch, &mut |record: JsonObject| {
                let identifier = record.get("identifier").and_then(JsonValue::as_str);
                let id = record.get("id").and_then(JsonValue::as_i64);
                if let (Some(identifier), Some(id)) = (identifier, id) {
                    by_identifier.insert(identifier.to_string(), id);
                }
                Ok(())
            })
            .await;
        *self.engine.stats_mut() = stats;
        result?;

        let mut resolved = BTreeSet::new();
        for identifier in identifiers {
            match by_identifier.get(identifier) {
                Some(id) => {
                    resolved.insert(*id);
                }
                None => warn!("Project identifier '{identifier}' not found"),
            }
        }
        Ok(resolved.into_iter().collect())
    }

    // ========================================================================
    // Sync
    // ========================================================================

    /// Sync every selected stream into `sink`
    pub async fn run<S: MessageSink>(
        mut self,
        selection: &Selection,
        sink: &mut S,
    ) -> Result<SyncStats> {
        let start = Instant::now();
        self.resolve_project_identifiers().await;

        let streams = std::mem::take(&mut self.streams);
        let mut routers: HashMap<String, ParentRouter> = streams
            .iter()
            .filter(|stream| selection.includes(&stream.name))
            .filter_map(|stream| {
                stream
                    .parent
                    .as_ref()
                    .map(|relation| (stream.name.clone(), ParentRouter::new(relation.clone())))
            })
            .collect();
        let mut failed = Vec::new();

        for stream in &streams {
            if !selection.includes(&stream.name) {
                debug!("Skipping unselected stream {}", stream.name);
                continue;
            }

            info!("Syncing stream {}", stream.name);
            match self
                .sync_selected(stream, &streams, selection, &mut routers, sink)
                .await
            {
                Ok(outcome) => {
                    info!(
                        "Stream {} finished: {} records in {} pages",
                        stream.name, outcome.records, outcome.pages
                    );
                    self.engine.stats_mut().add_stream();
                    if outcome.status == StreamStatus::PermissionDenied {
                        self.engine.stats_mut().add_denied();
                    }
                }
                Err(e @ Error::Output { .. }) => return Err(e),
                Err(e) => match self.config.stream_error_policy {
                    StreamErrorPolicy::FailRun => return Err(e),
                    StreamErrorPolicy::SkipStream => {
                        error!("Stream {} failed: {e}", stream.name);
                        sink.emit(&Message::state(self.state.snapshot()))?;
                        failed.push(stream.name.clone());
                    }
                },
            }
        }

        sink.flush()?;
        if !failed.is_empty() {
            return Err(Error::StreamsFailed { streams: failed });
        }

        let mut stats = self.engine.into_stats();
        stats.set_duration(start.elapsed().as_millis() as u64);
        info!(
            "Sync complete: {} records from {} streams in {}ms",
            stats.records_synced, stats.streams_synced, stats.duration_ms
        );
        Ok(stats)
    }

    async fn sync_selected<S: MessageSink>(
        &mut self,
        stream: &StreamDefinition,
        streams: &[StreamDefinition],
        selection: &Selection,
        routers: &mut HashMap<String, ParentRouter>,
        sink: &mut S,
    ) -> Result<StreamOutcome> {
        sink.emit(&Message::schema(stream))?;

        let contexts = match &stream.parent {
            Some(relation) => Some(match routers.remove(&stream.name) {
                Some(router) if selection.includes(&relation.stream) => router.into_partitions(),
                _ => self.collect_parent_contexts(relation, streams).await?,
            }),
            None => None,
        };

        let name = stream.name.as_str();
        let mut emit = |record: JsonObject| -> Result<()> {
            for router in routers.values_mut() {
                if router.relation().stream == name {
                    router.observe(&record);
                }
            }
            let extracted = format_datetime(&Utc::now());
            sink.emit(&Message::record(name, record, Some(extracted)))
        };

        let outcome = match &contexts {
            Some(contexts) => {
                self.engine
                    .sync_partitioned_stream(stream, contexts, &mut self.state, &mut emit)
                    .await?
            }
            None => {
                self.engine
                    .sync_stream(stream, None, &mut self.state, &mut emit)
                    .await?
            }
        };

        self.state.mark_synced(Utc::now());
        sink.emit(&Message::state(self.state.snapshot()))?;
        Ok(outcome)
    }

    /// Read an unselected parent stream without emitting anything, keeping
    /// only the contexts its records yield
    async fn collect_parent_contexts(
        &mut self,
        relation: &ParentRelation,
        streams: &[StreamDefinition],
    ) -> Result<Vec<ParentContext>> {
        let parent = streams
            .iter()
            .find(|s| s.name == relation.stream)
            .ok_or_else(|| Error::StreamNotFound {
                stream: relation.stream.clone(),
            })?;

        info!(
            "Reading unselected parent stream {} for its child contexts",
            parent.name
        );
        let mut router = ParentRouter::new(relation.clone());
        let mut scratch = self.state.clone();
        let records_before = self.engine.stats().records_synced;

        let result = self
            .engine
            .sync_stream(parent, None, &mut scratch, &mut |record: JsonObject| {
                router.observe(&record);
                Ok(())
            })
            .await;
        self.engine.stats_mut().records_synced = records_before;
        result?;

        debug!("Collected {} parent contexts", router.len());
        Ok(router.into_partitions())
    }
}

impl<F: Fetcher + std::fmt::Debug> std::fmt::Debug for Tap<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tap")
            .field("config", &self.config)
            .field("streams", &self.streams.len())
            .field("engine", &self.engine)
            .field("state", &self.state)
            .finish()
    }
}

/// Minimal projects definition used to map identifiers to ids
fn project_lookup() -> StreamDefinition {
    StreamDefinition::new(
        "projects",
        "/projects",
        vec![
            Field::new("id", FieldType::Integer).required(),
            Field::new("identifier", FieldType::String),
        ],
    )
}
