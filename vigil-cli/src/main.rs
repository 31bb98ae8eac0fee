//! Vigil CLI
//!
//! Command-line view of pipeline run status timelines: show a run, follow it
//! live over the dashboard's WebSocket channel, or replay recorded updates.

mod commands;
mod config;
mod render;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, handle_command};
use config::{Config, TokenSource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Pipeline run status timeline", long_about = None)]
struct Cli {
    /// Dashboard REST API URL
    #[arg(long, env = "VIGIL_API_URL", default_value = "http://localhost:8080/api")]
    api_url: String,

    /// Live channel base URL (derived from the API URL when omitted)
    #[arg(long, env = "VIGIL_WS_URL")]
    ws_url: Option<String>,

    /// Bearer token
    #[arg(long, env = "VIGIL_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// File holding the bearer token, re-read on every reconnect
    #[arg(long, env = "VIGIL_TOKEN_FILE", conflicts_with = "token")]
    token_file: Option<PathBuf>,

    /// Reconnect attempts after the live channel drops
    #[arg(long, env = "VIGIL_RECONNECT_ATTEMPTS", default_value = "5")]
    reconnect_attempts: u32,

    /// Seconds between reconnect attempts
    #[arg(long, env = "VIGIL_RECONNECT_INTERVAL", default_value = "5")]
    reconnect_interval: u64,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn config(&self) -> Config {
        let token = match (&self.token, &self.token_file) {
            (Some(token), _) => TokenSource::Static(token.clone()),
            (None, Some(path)) => TokenSource::File(path.clone()),
            (None, None) => TokenSource::None,
        };

        Config {
            api_url: self.api_url.clone(),
            ws_url: self.ws_url.clone(),
            token,
            reconnect_attempts: self.reconnect_attempts,
            reconnect_interval: Duration::from_secs(self.reconnect_interval),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vigil=info,vigil_client=info,vigil_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.config();
    config.validate().context("Invalid configuration")?;

    handle_command(cli.command, &config).await
}
