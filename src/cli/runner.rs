//! CLI runner - executes the requested mode

use crate::catalog::{Catalog, Selection};
use crate::cli::commands::{Cli, Mode};
use crate::config::TapConfig;
use crate::engine::SyncStats;
use crate::error::{Error, Result};
use crate::output::{JsonLinesSink, MessageSink};
use crate::state::StateManager;
use crate::streams::{all_streams, validate_streams};
use crate::tap::Tap;
use std::io::Write;
use tracing::{debug, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match self.cli.mode() {
            Mode::Discover => {
                let mut stdout = std::io::stdout().lock();
                self.discover(&mut stdout)
            }
            Mode::Sync => {
                let mut sink = JsonLinesSink::stdout();
                self.sync(&mut sink).await.map(|_| ())
            }
        }
    }

    /// Follow-up advice for a failed run, if any
    pub fn hint(error: &Error) -> Option<&'static str> {
        if error.is_config_error() {
            Some("no request was made; check the files given with --config, --state and --catalog")
        } else if error.is_permission_denied() {
            Some("the API key lacks permission for this resource")
        } else {
            None
        }
    }

    /// Load configuration; syncing cannot start without one
    fn load_config(&self) -> Result<TapConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use --config)"))?;
        debug!("Loading config from {}", path.display());
        TapConfig::from_file(path)
    }

    /// Load state; a missing file starts from scratch
    fn load_state(&self) -> Result<StateManager> {
        match &self.cli.state {
            Some(path) => StateManager::from_file(path),
            None => Ok(StateManager::in_memory()),
        }
    }

    /// Load the catalog, if one was given
    fn load_catalog(&self) -> Result<Option<Catalog>> {
        self.cli.catalog.as_ref().map(Catalog::from_file).transpose()
    }

    /// Write the discovery catalog to `out`
    pub fn discover<W: Write>(&self, out: &mut W) -> Result<()> {
        let streams = all_streams();
        validate_streams(&streams)?;
        let catalog = Catalog::discover(&streams);

        serde_json::to_writer_pretty(&mut *out, &catalog)
            .map_err(|e| Error::output(format!("Failed to write catalog: {e}")))?;
        writeln!(out).map_err(|e| Error::output(format!("Failed to write catalog: {e}")))?;
        info!("Discovered {} streams", catalog.streams.len());
        Ok(())
    }

    /// Sync the selected streams into `sink`
    pub async fn sync<S: MessageSink>(&self, sink: &mut S) -> Result<SyncStats> {
        let config = self.load_config()?;
        let state = self.load_state()?;
        let catalog = self.load_catalog()?;
        let selection = Selection::from_catalog(catalog.as_ref());

        info!("Starting sync against {}", config.base_url);
        let tap = Tap::new(config, state)?;
        tap.run(&selection, sink).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tempfile::TempDir;

    fn runner(args: &[&str]) -> Runner {
        let mut argv = vec!["tap-openproject"];
        argv.extend_from_slice(args);
        Runner::new(Cli::parse_from(argv))
    }

    fn write(dir: &TempDir, name: &str, contents: &str) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_discover_writes_catalog() {
        let mut out = Vec::new();
        runner(&["--discover"]).discover(&mut out).unwrap();

        let catalog: Value = serde_json::from_slice(&out).unwrap();
        let streams = catalog["streams"].as_array().unwrap();
        assert_eq!(streams.len(), 12);
        assert_eq!(streams[0]["tap_stream_id"], "projects");
    }

    #[tokio::test]
    async fn test_sync_requires_config() {
        let mut sink = crate::output::MemorySink::new();
        let err = runner(&[]).sync(&mut sink).await.unwrap_err();
        assert!(err.is_config_error());
        assert!(sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_sync_rejects_missing_api_key() {
        let dir = TempDir::new().unwrap();
        let config = write(&dir, "config.json", r#"{"base_url": "http://localhost"}"#);
        let mut sink = crate::output::MemorySink::new();

        let err = runner(&["--config", &config])
            .sync(&mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { .. }));
    }

    #[tokio::test]
    async fn test_sync_rejects_malformed_catalog() {
        let dir = TempDir::new().unwrap();
        let config = write(&dir, "config.json", r#"{"api_key": "abc"}"#);
        let catalog = write(&dir, "catalog.json", "{not json");
        let mut sink = crate::output::MemorySink::new();

        let err = runner(&["--config", &config, "--catalog", &catalog])
            .sync(&mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Catalog { .. }));
        assert!(sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_sync_rejects_malformed_state() {
        let dir = TempDir::new().unwrap();
        let config = write(&dir, "config.json", r#"{"api_key": "abc"}"#);
        let state = write(&dir, "state.json", "[1, 2");
        let mut sink = crate::output::MemorySink::new();

        let err = runner(&["--config", &config, "--state", &state])
            .sync(&mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::State { .. }));
    }

    #[test]
    fn test_missing_state_file_is_empty_state() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("state.json");
        let runner = runner(&["--state", missing.to_str().unwrap()]);

        let state = runner.load_state().unwrap();
        assert!(state.state().is_empty());
    }

    #[test]
    fn test_hint() {
        assert!(Runner::hint(&Error::missing_field("api_key"))
            .unwrap()
            .contains("--config"));
        assert!(Runner::hint(&Error::catalog("bad")).is_some());
        assert!(Runner::hint(&Error::http_status(403, "")).is_some());
        assert!(Runner::hint(&Error::http_status(500, "")).is_none());
    }

    #[test]
    fn test_missing_config_file() {
        let runner = runner(&["--config", "/nonexistent/config.json"]);
        assert!(matches!(
            runner.load_config(),
            Err(Error::FileNotFound { .. })
        ));
    }
}
