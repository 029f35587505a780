//! `fixflow status` command - Show session and project status

use clap::Parser;
use serde::Serialize;

use crate::config::FixflowConfig;
use crate::dashboard::text::read_log_lines;
use crate::progress::{summarize, ProgressRecord, ProjectStatus, StatusClassifier};
use crate::state::StateDir;
use crate::workflow::{SessionStatus, Workflow};

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct WorkflowReport {
    workflow: Workflow,
    status: SessionStatus,
    projects: Vec<ProjectReport>,
}

#[derive(Debug, Serialize)]
struct ProjectReport {
    project: String,
    status: ProjectStatus,
}

pub async fn execute(args: StatusArgs, config: FixflowConfig) -> anyhow::Result<()> {
    let state = config.state();
    let selection = state.load_selection();
    let workflows = if selection.workflows.is_empty() {
        Workflow::ALL.to_vec()
    } else {
        Workflow::canonical(&selection.workflows)
    };

    let classifier = config.classifier.build();
    let reports: Vec<WorkflowReport> = workflows
        .iter()
        .map(|w| report(&state, classifier.as_ref(), *w, &selection.projects))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!("fixflow status\n");
    for report in &reports {
        println!("  {} {:<6} {}", report.status.symbol(), report.workflow, report.status);
        if !report.projects.is_empty() {
            let glyphs: Vec<String> = report
                .projects
                .iter()
                .map(|p| format!("{} {}", p.status.symbol(), p.project))
                .collect();
            println!("      {}", glyphs.join("  "));
        }
    }

    Ok(())
}

fn report(
    state: &StateDir,
    classifier: &dyn StatusClassifier,
    workflow: Workflow,
    projects: &[String],
) -> WorkflowReport {
    let progress = ProgressRecord::load(&state.progress_path(workflow));
    let lines = read_log_lines(&state.log_path(workflow));

    WorkflowReport {
        workflow,
        status: state.read_status_blocking(workflow),
        projects: summarize(classifier, projects, progress.as_ref(), &lines)
            .into_iter()
            .map(|(project, status)| ProjectReport { project, status })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::HeuristicClassifier;
    use tempfile::TempDir;

    #[test]
    fn test_report_combines_status_progress_and_log() {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path());
        state.ensure_layout().unwrap();
        std::fs::write(state.status_path(Workflow::Test), "RUNNING\n").unwrap();
        std::fs::write(
            state.progress_path(Workflow::Test),
            r#"{"current_project":"web","current_task":2,"completed_projects":["api"]}"#,
        )
        .unwrap();
        std::fs::write(state.log_path(Workflow::Test), "docs: done\n").unwrap();

        let projects = vec!["api".to_string(), "web".to_string(), "docs".to_string(), "cli".to_string()];
        let report = report(&state, &HeuristicClassifier, Workflow::Test, &projects);

        assert_eq!(report.status, SessionStatus::Running);
        let statuses: Vec<ProjectStatus> = report.projects.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![
                ProjectStatus::Pass,
                ProjectStatus::Running,
                ProjectStatus::Pass,
                ProjectStatus::Pending
            ]
        );
    }
}
