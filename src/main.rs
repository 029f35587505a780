//! fixflow CLI - Run fix workflows across your projects in parallel

use std::fs::OpenOptions;
use std::sync::Mutex;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fixflow::config::{load_config, FixflowConfig};
use fixflow::state::StateDir;

#[derive(Parser, Debug)]
#[command(name = "fixflow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<fixflow::cli::Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let workspace_dir = fixflow::cli::find_workspace_dir()?;
    let config = FixflowConfig::from(load_config(&workspace_dir)?).with_workspace_dir(workspace_dir);

    init_tracing(&config.state(), cli.verbose)?;

    // Execute command
    fixflow::cli::handle_command(cli.command.unwrap_or_default(), config).await?;

    Ok(())
}

/// Log to a file under the state dir; the terminal belongs to the dashboard
fn init_tracing(state: &StateDir, verbose: bool) -> anyhow::Result<()> {
    std::fs::create_dir_all(state.root())?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(state.trace_log_path())?;

    let env_filter = if verbose {
        tracing::level_filters::LevelFilter::DEBUG
    } else {
        tracing::level_filters::LevelFilter::INFO
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false))
        .with(tracing_subscriber::EnvFilter::builder()
            .with_default_directive(env_filter.into())
            .from_env_lossy())
        .init();

    Ok(())
}
