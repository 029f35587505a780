//! `fixflow reset` command - Forget session state

use clap::Parser;

use crate::config::FixflowConfig;
use crate::workflow::Workflow;

#[derive(Parser, Debug)]
pub struct ResetArgs {
    /// Workflows to reset (default: all)
    workflows: Vec<Workflow>,
}

pub async fn execute(args: ResetArgs, config: FixflowConfig) -> anyhow::Result<()> {
    let state = config.state();
    let targets = if args.workflows.is_empty() {
        Workflow::ALL.to_vec()
    } else {
        Workflow::canonical(&args.workflows)
    };

    for workflow in targets {
        state.reset(workflow).await?;
        tracing::info!(workflow = %workflow, "Reset session state");
        println!("Reset {}", workflow);
    }

    Ok(())
}
