//! tap-openproject CLI
//!
//! Extracts OpenProject entities as Singer messages on stdout

use clap::Parser;
use tap_openproject::cli::{Cli, Runner};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Logs go to stderr; stdout carries only messages
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let runner = Runner::new(cli);

    if let Err(e) = runner.run().await {
        eprintln!("Error: {e}");
        if let Some(hint) = Runner::hint(&e) {
            eprintln!("Hint: {hint}");
        }
        std::process::exit(1);
    }
}
