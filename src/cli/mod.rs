//! CLI command handlers

pub mod reset;
pub mod run;
pub mod status;

use clap::Subcommand;
use std::path::PathBuf;

use crate::config::{FixflowConfig, CONFIG_FILE};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the selected workflows with a live dashboard (default)
    Run(run::RunArgs),

    /// Show session and project status from the last run
    Status(status::StatusArgs),

    /// Forget session state so workflows start fresh
    Reset(reset::ResetArgs),
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Run(run::RunArgs::default())
    }
}

pub async fn handle_command(cmd: Commands, config: FixflowConfig) -> anyhow::Result<()> {
    match cmd {
        Commands::Run(args) => run::execute(args, config).await,
        Commands::Status(args) => status::execute(args, config).await,
        Commands::Reset(args) => reset::execute(args, config).await,
    }
}

pub fn find_workspace_dir() -> anyhow::Result<PathBuf> {
    let current = std::env::current_dir()?;

    // Look for .fixflow.toml or an existing state directory
    for ancestor in current.ancestors() {
        let config_file = ancestor.join(CONFIG_FILE);
        let state_dir = ancestor.join(".fixflow");

        if config_file.exists() || state_dir.is_dir() {
            return Ok(PathBuf::from(ancestor));
        }
    }

    // Default to current directory
    Ok(current)
}
