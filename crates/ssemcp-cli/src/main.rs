//! ssemcp command-line driver
//!
//! ```bash
//! ssemcp tools
//! ssemcp call echo --args '{"text": "hi"}'
//! ssemcp --url http://localhost:8008/a/mcp ping
//! ```

mod args;
mod commands;

use anyhow::Context;
use args::Cli;
use clap::Parser;
use ssemcp_core::{ClientConfig, SseClient};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose when set
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    tracing::debug!("Using MCP endpoint {}", config.base_url);

    let client = SseClient::new(config).context("Failed to create client")?;
    let exit = commands::run(&client, &cli).await;
    client.close();
    exit
}

/// Config file, then `SSEMCP_*` environment, then `--url`
fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = ClientConfig::load_from_file(&cli.config)?;
    config.apply_env_overrides()?;
    if let Some(url) = &cli.url {
        config.base_url = url.clone();
    }
    Ok(config)
}
