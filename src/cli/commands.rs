//! CLI arguments

use clap::Parser;
use std::path::PathBuf;

/// Singer tap for the OpenProject API v3
#[derive(Parser, Debug)]
#[command(name = "tap-openproject")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print the catalog of available streams and exit
    #[arg(short, long)]
    pub discover: bool,

    /// Configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// State file from a previous run (JSON)
    #[arg(short, long)]
    pub state: Option<PathBuf>,

    /// Catalog file selecting the streams to sync (JSON)
    #[arg(long, alias = "properties")]
    pub catalog: Option<PathBuf>,
}

impl Cli {
    /// Mode requested on the command line
    pub fn mode(&self) -> Mode {
        if self.discover {
            Mode::Discover
        } else {
            Mode::Sync
        }
    }
}

/// What a run does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Print the catalog
    Discover,
    /// Extract records
    Sync,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_discover_flag() {
        let cli = Cli::parse_from(["tap-openproject", "--discover"]);
        assert_eq!(cli.mode(), Mode::Discover);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_sync_arguments() {
        let cli = Cli::parse_from([
            "tap-openproject",
            "--config",
            "config.json",
            "--state",
            "state.json",
            "--catalog",
            "catalog.json",
        ]);
        assert_eq!(cli.mode(), Mode::Sync);
        assert_eq!(cli.config, Some(PathBuf::from("config.json")));
        assert_eq!(cli.state, Some(PathBuf::from("state.json")));
        assert_eq!(cli.catalog, Some(PathBuf::from("catalog.json")));
    }

    #[test]
    fn test_properties_alias() {
        let cli = Cli::parse_from(["tap-openproject", "-c", "c.json", "--properties", "p.json"]);
        assert_eq!(cli.catalog, Some(PathBuf::from("p.json")));
    }
}
