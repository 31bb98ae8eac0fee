//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod run;

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show the current status of a pipeline run
    Status {
        /// Pipeline run ID
        run_id: String,
    },
    /// Follow a pipeline run's status timeline live
    Watch {
        /// Pipeline run ID
        run_id: String,
    },
    /// Merge recorded status payloads offline and print the timeline
    Replay {
        /// File with one JSON status payload per line
        file: PathBuf,

        /// Snapshot to seed the timeline with (bare or wrapped in `data`)
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Status { run_id } => run::show_status(config, &run_id).await,
        Commands::Watch { run_id } => run::watch_run(config, &run_id).await,
        Commands::Replay { file, snapshot } => run::replay(&file, snapshot.as_deref()),
    }
}
