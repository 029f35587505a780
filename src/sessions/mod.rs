//! Session supervision: one external process per selected workflow

pub mod executor;
pub mod log_sink;
pub mod prompt;

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::state::StateDir;
use crate::workflow::{SessionStatus, Workflow};
use self::executor::SessionExecutor;

/// Which stream a log chunk came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
    /// Lines written by fixflow itself (resume delimiter, spawn errors)
    Supervisor,
}

/// Events emitted by the supervision side for the dashboard
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Found `RUNNING` before launch; this run resumes it
    Abandoned { workflow: Workflow },
    StatusChanged { workflow: Workflow, status: SessionStatus },
    /// Bytes exactly as written to the log; not split on line boundaries
    Output { workflow: Workflow, stream: OutputStream, bytes: Vec<u8> },
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub workflow: Workflow,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<SessionOutcome>,
    /// Workflows that were abandoned by an earlier run and resumed
    pub resumed: Vec<Workflow>,
}

impl RunSummary {
    pub fn all_completed(&self) -> bool {
        self.outcomes.iter().all(|o| o.status == SessionStatus::Completed)
    }

    pub fn failed(&self) -> Vec<Workflow> {
        self.outcomes
            .iter()
            .filter(|o| o.status == SessionStatus::Failed)
            .map(|o| o.workflow)
            .collect()
    }
}

/// Fans the supervisor out across every selected workflow
pub struct Orchestrator {
    executor: Arc<SessionExecutor>,
    state: StateDir,
    events: EventSender,
}

impl Orchestrator {
    pub fn new(executor: SessionExecutor) -> Self {
        let state = executor.state().clone();
        let events = executor.events().clone();
        Self {
            executor: Arc::new(executor),
            state,
            events,
        }
    }

    /// Workflows whose status was left `RUNNING` by an earlier run
    pub async fn detect_abandoned(&self, workflows: &[Workflow]) -> Vec<Workflow> {
        let mut abandoned = vec![];
        for &workflow in workflows {
            if self.state.read_status(workflow).await == SessionStatus::Running {
                abandoned.push(workflow);
            }
        }
        abandoned
    }

    /// Run every selected workflow concurrently and wait for all of them.
    /// A failing session never cancels its siblings.
    pub async fn run_all(&self, selected: &[Workflow], projects: &[String]) -> RunSummary {
        let workflows = Workflow::canonical(selected);

        // Must happen before any supervisor touches a status file
        let resumed = self.detect_abandoned(&workflows).await;
        for workflow in &resumed {
            tracing::warn!(workflow = %workflow, "Found abandoned session, resuming");
            let _ = self.events.send(SessionEvent::Abandoned { workflow: *workflow });
        }

        tracing::info!(workflows = workflows.len(), projects = projects.len(), "Launching sessions");

        let projects: Arc<[String]> = projects.into();
        let handles: Vec<_> = workflows
            .iter()
            .map(|&workflow| {
                let executor = Arc::clone(&self.executor);
                let projects = Arc::clone(&projects);
                let handle = tokio::spawn(async move {
                    executor.run_session(workflow, &projects).await
                });
                (workflow, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (workflow, handle) in handles {
            let status = match handle.await {
                Ok(true) => SessionStatus::Completed,
                Ok(false) => SessionStatus::Failed,
                Err(e) => {
                    tracing::error!(workflow = %workflow, error = %e, "Session task died");
                    if let Err(e) = self.state.write_status(workflow, SessionStatus::Failed).await {
                        tracing::error!(workflow = %workflow, error = %e, "Failed to record session status");
                    }
                    let _ = self.events.send(SessionEvent::StatusChanged {
                        workflow,
                        status: SessionStatus::Failed,
                    });
                    SessionStatus::Failed
                }
            };
            outcomes.push(SessionOutcome { workflow, status });
        }

        RunSummary { outcomes, resumed }
    }
}
