//! On-disk state layout: selections, logs, status markers and progress beacons
//!
//! ```text
//! <state_dir>/
//!   selected-workflows.txt
//!   selected-projects.txt
//!   fixflow.log
//!   logs/<workflow>.log
//!   logs/<workflow>.status
//!   logs/<workflow>.prompt
//!   logs/<workflow>.session
//!   progress/<workflow>-progress.json
//! ```
//!
//! Every reader here treats a missing or unreadable file as "no data yet".

use std::io;
use std::path::{Path, PathBuf};

use crate::error::FixflowError;
use crate::workflow::{SessionStatus, Workflow};

#[derive(Debug, Clone)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn progress_dir(&self) -> PathBuf {
        self.root.join("progress")
    }

    pub fn log_path(&self, workflow: Workflow) -> PathBuf {
        self.logs_dir().join(format!("{}.log", workflow))
    }

    pub fn status_path(&self, workflow: Workflow) -> PathBuf {
        self.logs_dir().join(format!("{}.status", workflow))
    }

    pub fn prompt_path(&self, workflow: Workflow) -> PathBuf {
        self.logs_dir().join(format!("{}.prompt", workflow))
    }

    pub fn session_id_path(&self, workflow: Workflow) -> PathBuf {
        self.logs_dir().join(format!("{}.session", workflow))
    }

    pub fn progress_path(&self, workflow: Workflow) -> PathBuf {
        self.progress_dir().join(format!("{}-progress.json", workflow))
    }

    pub fn selected_workflows_path(&self) -> PathBuf {
        self.root.join("selected-workflows.txt")
    }

    pub fn selected_projects_path(&self) -> PathBuf {
        self.root.join("selected-projects.txt")
    }

    /// Diagnostic log for fixflow itself (not a session log)
    pub fn trace_log_path(&self) -> PathBuf {
        self.root.join("fixflow.log")
    }

    /// Create `logs/` and `progress/` under the root
    pub fn ensure_layout(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.logs_dir())?;
        std::fs::create_dir_all(self.progress_dir())?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Session status
    // ------------------------------------------------------------------------

    /// Current status marker. A missing file is `Pending`.
    pub async fn read_status(&self, workflow: Workflow) -> SessionStatus {
        status_from(workflow, tokio::fs::read_to_string(self.status_path(workflow)).await)
    }

    /// `read_status` for callers outside the runtime (dashboard seeding, `status`)
    pub fn read_status_blocking(&self, workflow: Workflow) -> SessionStatus {
        status_from(workflow, std::fs::read_to_string(self.status_path(workflow)))
    }

    pub async fn write_status(&self, workflow: Workflow, status: SessionStatus) -> io::Result<()> {
        tokio::fs::create_dir_all(self.logs_dir()).await?;
        tokio::fs::write(self.status_path(workflow), format!("{}\n", status)).await
    }

    // ------------------------------------------------------------------------
    // Session id (lets a resume target the right conversation)
    // ------------------------------------------------------------------------

    pub async fn read_session_id(&self, workflow: Workflow) -> Option<String> {
        tokio::fs::read_to_string(self.session_id_path(workflow))
            .await
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub async fn write_session_id(&self, workflow: Workflow, id: &str) -> io::Result<()> {
        tokio::fs::write(self.session_id_path(workflow), format!("{}\n", id)).await
    }

    /// Forget status, session id and progress so the next run starts fresh.
    /// The log is left in place; a fresh session truncates it anyway.
    pub async fn reset(&self, workflow: Workflow) -> io::Result<()> {
        for path in [
            self.status_path(workflow),
            self.session_id_path(workflow),
            self.progress_path(workflow),
        ] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Previously persisted selection. Unknown workflow tokens are skipped.
    pub fn load_selection(&self) -> Selection {
        let workflows = read_tokens(&self.selected_workflows_path())
            .into_iter()
            .filter_map(|token| match token.parse::<Workflow>() {
                Ok(w) => Some(w),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring persisted workflow selection");
                    None
                }
            })
            .collect();

        Selection {
            workflows,
            projects: read_tokens(&self.selected_projects_path()),
        }
    }

    pub fn save_selection(&self, selection: &Selection) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let workflows: Vec<&str> = selection.workflows.iter().map(|w| w.as_str()).collect();
        std::fs::write(self.selected_workflows_path(), join_lines(&workflows))?;
        std::fs::write(self.selected_projects_path(), join_lines(&selection.projects))?;
        Ok(())
    }
}

/// The `(workflows, projects)` tuple a run operates on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub workflows: Vec<Workflow>,
    pub projects: Vec<String>,
}

impl Selection {
    /// Normalise to canonical workflow order and reject empty selections
    pub fn validate(self) -> Result<Self, FixflowError> {
        let workflows = Workflow::canonical(&self.workflows);
        if workflows.is_empty() {
            return Err(FixflowError::NoWorkflows);
        }

        let mut projects: Vec<String> = Vec::with_capacity(self.projects.len());
        for project in self.projects {
            let project = project.trim().to_string();
            if !project.is_empty() && !projects.contains(&project) {
                projects.push(project);
            }
        }
        if projects.is_empty() {
            return Err(FixflowError::NoProjects);
        }

        Ok(Self { workflows, projects })
    }
}

fn status_from(workflow: Workflow, read: io::Result<String>) -> SessionStatus {
    match read {
        Ok(contents) => SessionStatus::parse_marker(&contents),
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::debug!(workflow = %workflow, error = %e, "Unreadable status file");
            }
            SessionStatus::Pending
        }
    }
}

fn read_tokens(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|contents| {
            contents
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn join_lines<S: AsRef<str>>(items: &[S]) -> String {
    let mut out = String::new();
    for item in items {
        out.push_str(item.as_ref());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_status_reads_pending() {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path());
        assert_eq!(state.read_status(Workflow::Lint).await, SessionStatus::Pending);
        assert_eq!(state.read_status_blocking(Workflow::Lint), SessionStatus::Pending);
    }

    #[tokio::test]
    async fn test_status_round_trip_through_marker_file() {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path());

        state.write_status(Workflow::Test, SessionStatus::Running).await.unwrap();
        assert_eq!(state.read_status(Workflow::Test).await, SessionStatus::Running);
        assert_eq!(state.read_status_blocking(Workflow::Test), SessionStatus::Running);

        let raw = std::fs::read_to_string(state.status_path(Workflow::Test)).unwrap();
        assert_eq!(raw, "RUNNING\n");
    }

    #[test]
    fn test_selection_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path());
        let selection = Selection {
            workflows: vec![Workflow::Type, Workflow::Lint],
            projects: vec!["api".into(), "web".into()],
        };

        state.save_selection(&selection).unwrap();
        assert_eq!(state.load_selection(), selection);
    }

    #[test]
    fn test_load_selection_skips_unknown_and_blank_tokens() {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path());
        std::fs::write(state.selected_workflows_path(), "lint\n\nbogus\ntype\n").unwrap();
        std::fs::write(state.selected_projects_path(), "# comment\napi\n").unwrap();

        let selection = state.load_selection();
        assert_eq!(selection.workflows, vec![Workflow::Lint, Workflow::Type]);
        assert_eq!(selection.projects, vec!["api".to_string()]);
    }

    #[test]
    fn test_validate_rejects_empty_selection() {
        let empty_workflows = Selection { workflows: vec![], projects: vec!["api".into()] };
        assert!(matches!(empty_workflows.validate(), Err(FixflowError::NoWorkflows)));

        let empty_projects = Selection { workflows: vec![Workflow::Build], projects: vec![" ".into()] };
        assert!(matches!(empty_projects.validate(), Err(FixflowError::NoProjects)));
    }

    #[test]
    fn test_validate_orders_and_dedupes() {
        let selection = Selection {
            workflows: vec![Workflow::Lint, Workflow::Build],
            projects: vec!["web".into(), "api".into(), "web".into()],
        }
        .validate()
        .unwrap();

        assert_eq!(selection.workflows, vec![Workflow::Build, Workflow::Lint]);
        assert_eq!(selection.projects, vec!["web".to_string(), "api".to_string()]);
    }

    #[tokio::test]
    async fn test_reset_clears_status_and_session() {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path());
        state.ensure_layout().unwrap();
        state.write_status(Workflow::Build, SessionStatus::Running).await.unwrap();
        state.write_session_id(Workflow::Build, "abc").await.unwrap();

        state.reset(Workflow::Build).await.unwrap();
        assert_eq!(state.read_status(Workflow::Build).await, SessionStatus::Pending);
        assert_eq!(state.read_session_id(Workflow::Build).await, None);

        // Resetting again is a no-op
        state.reset(Workflow::Build).await.unwrap();
    }
}
