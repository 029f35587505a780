//! `fixflow run` command - Run the selected workflows

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;

use crate::config::FixflowConfig;
use crate::dashboard::context::DashboardContext;
use crate::dashboard::{Dashboard, DashboardExit};
use crate::sessions::executor::SessionExecutor;
use crate::sessions::{EventReceiver, Orchestrator, RunSummary, SessionEvent};
use crate::state::{Selection, StateDir};
use crate::workflow::{SessionStatus, Workflow};

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Workflow to run: type, build, test or lint (repeatable)
    #[arg(short, long = "workflow", value_name = "WORKFLOW")]
    workflows: Vec<Workflow>,

    /// Project to work on (repeatable)
    #[arg(short, long = "project", value_name = "PROJECT")]
    projects: Vec<String>,

    /// Restart abandoned sessions instead of resuming them
    #[arg(long)]
    fresh: bool,

    /// Run without the dashboard
    #[arg(long)]
    headless: bool,

    /// Let sessions run without permission prompts
    #[arg(long)]
    dangerously_skip_permissions: bool,

    /// Tool sessions may use without asking (repeatable)
    #[arg(long = "allowed-tool", value_name = "TOOL")]
    allowed_tools: Vec<String>,
}

impl RunArgs {
    fn grants(&self) -> Vec<String> {
        let mut grants = vec![];
        if self.dangerously_skip_permissions {
            grants.push("--dangerously-skip-permissions".to_string());
        }
        if !self.allowed_tools.is_empty() {
            grants.push("--allowedTools".to_string());
            grants.push(self.allowed_tools.join(","));
        }
        grants
    }
}

pub async fn execute(args: RunArgs, config: FixflowConfig) -> anyhow::Result<()> {
    let state = config.state();
    state
        .ensure_layout()
        .with_context(|| format!("Failed to create {}", state.root().display()))?;

    let selection = resolve_selection(&args, &state)?;
    state.save_selection(&selection).context("Failed to save selection")?;

    if args.fresh {
        for workflow in &selection.workflows {
            if state.read_status(*workflow).await == SessionStatus::Running {
                state.reset(*workflow).await?;
                tracing::info!(workflow = %workflow, "Discarded abandoned session");
            }
        }
    }

    let config = config.with_grants(args.grants());
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let orchestrator = Orchestrator::new(SessionExecutor::from_config(&config, event_tx));

    tracing::info!(
        workflows = ?selection.workflows,
        projects = ?selection.projects,
        headless = args.headless,
        "Starting run"
    );

    let summary = if args.headless {
        run_headless(orchestrator, &selection, event_rx).await
    } else {
        match run_with_dashboard(orchestrator, &selection, &config, event_rx).await? {
            Some(summary) => summary,
            None => {
                println!("Quit. Unfinished sessions will resume on the next run.");
                return Ok(());
            }
        }
    };

    print_results(&summary, &state);
    Ok(())
}

/// CLI selection wins; otherwise reuse the persisted one
fn resolve_selection(args: &RunArgs, state: &StateDir) -> anyhow::Result<Selection> {
    let previous = state.load_selection();
    let selection = Selection {
        workflows: if args.workflows.is_empty() { previous.workflows } else { args.workflows.clone() },
        projects: if args.projects.is_empty() { previous.projects } else { args.projects.clone() },
    };
    Ok(selection.validate()?)
}

async fn run_with_dashboard(
    orchestrator: Orchestrator,
    selection: &Selection,
    config: &FixflowConfig,
    events: EventReceiver,
) -> anyhow::Result<Option<RunSummary>> {
    // Take the terminal first: a failure here must not leave sessions behind
    let mut dashboard = Dashboard::new()?;

    let mut ctx = DashboardContext::new(
        config.state(),
        &selection.workflows,
        &selection.projects,
        config.classifier.build(),
        config.log_history,
    );

    let workflows = selection.workflows.clone();
    let projects = selection.projects.clone();
    let handle = tokio::spawn(async move { orchestrator.run_all(&workflows, &projects).await });

    let exit = dashboard.run(&mut ctx, events, handle, config.poll_interval).await;
    dashboard.cleanup()?;

    match exit? {
        DashboardExit::Finished(joined) => Ok(Some(joined.context("Session orchestrator failed")?)),
        DashboardExit::Quit => Ok(None),
    }
}

/// Print status transitions while the sessions run
async fn run_headless(
    orchestrator: Orchestrator,
    selection: &Selection,
    mut events: EventReceiver,
) -> RunSummary {
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Abandoned { workflow } => {
                    println!("↻ {} was abandoned by an earlier run, resuming", workflow);
                }
                SessionEvent::StatusChanged { workflow, status } => {
                    println!("{} {} {}", status.symbol(), workflow, status);
                }
                SessionEvent::Output { .. } => {}
            }
        }
    });

    let summary = orchestrator.run_all(&selection.workflows, &selection.projects).await;
    // Dropping the orchestrator closes the channel and ends the printer
    drop(orchestrator);
    let _ = printer.await;
    summary
}

fn print_results(summary: &RunSummary, state: &StateDir) {
    println!();
    if summary.all_completed() {
        println!("✅ ALL WORKFLOWS COMPLETED");
    } else {
        println!("⚠️  COMPLETED WITH FAILURES");
    }

    println!("{}", "━".repeat(60));
    for outcome in &summary.outcomes {
        let resumed = if summary.resumed.contains(&outcome.workflow) { " (resumed)" } else { "" };
        println!(
            "  {} {:<6} {}{}",
            outcome.status.symbol(),
            outcome.workflow,
            outcome.status,
            resumed
        );
    }
    let failed = summary.failed();
    if !failed.is_empty() {
        let names: Vec<&str> = failed.iter().map(|w| w.as_str()).collect();
        println!();
        println!("Failed: {} (see their logs)", names.join(", "));
    }
    println!();
    println!("Logs: {}", state.logs_dir().display());
}
