//! Everything one dashboard run knows, fed by session events and the
//! progress beacons on disk

use std::collections::BTreeMap;

use crate::dashboard::state::DashboardState;
use crate::dashboard::text::{decode_line, read_log_lines};
use crate::progress::{summarize, ProgressRecord, ProjectStatus, StatusClassifier};
use crate::sessions::{OutputStream, SessionEvent};
use crate::state::StateDir;
use crate::workflow::{SessionStatus, Workflow};

/// An unterminated line longer than this is shown as a line of its own
const MAX_PARTIAL_BYTES: usize = 8192;

pub struct WorkflowPanel {
    pub workflow: Workflow,
    pub status: SessionStatus,
    /// Abandoned by an earlier run and resumed by this one
    pub resumed: bool,
    lines: Vec<String>,
    /// Bytes after each stream's last newline
    partial: BTreeMap<OutputStream, Vec<u8>>,
    progress: Option<ProgressRecord>,
    summary: Vec<(String, ProjectStatus)>,
    dirty: bool,
}

impl WorkflowPanel {
    fn load(store: &StateDir, workflow: Workflow, history: usize) -> Self {
        let mut lines = read_log_lines(&store.log_path(workflow));
        if lines.len() > history {
            lines.drain(..lines.len() - history);
        }

        Self {
            workflow,
            status: store.read_status_blocking(workflow),
            resumed: false,
            lines,
            partial: BTreeMap::new(),
            progress: ProgressRecord::load(&store.progress_path(workflow)),
            summary: vec![],
            dirty: true,
        }
    }

    /// The newest `n` lines, oldest first. Unterminated output (a prompt
    /// waiting for input, say) counts as the newest line of its stream.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let pending: Vec<String> = self.partial.values().filter_map(|raw| decode_line(raw)).collect();
        let from_lines = n.saturating_sub(pending.len());
        let mut tail: Vec<String> = self.lines[self.lines.len().saturating_sub(from_lines)..].to_vec();
        tail.extend(pending);
        let excess = tail.len().saturating_sub(n);
        tail.drain(..excess);
        tail
    }

    pub fn summary(&self) -> &[(String, ProjectStatus)] {
        &self.summary
    }

    /// Split a chunk into lines, holding back whatever follows the last newline
    fn push_output(&mut self, stream: OutputStream, bytes: &[u8], history: usize) {
        let complete = {
            let pending = self.partial.entry(stream).or_default();
            pending.extend_from_slice(bytes);

            let mut complete = vec![];
            while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let rest = pending.split_off(pos + 1);
                complete.push(std::mem::replace(pending, rest));
            }
            if pending.len() > MAX_PARTIAL_BYTES {
                complete.push(std::mem::take(pending));
            }
            complete
        };

        for raw in complete {
            self.push_line(&raw, history);
        }
        self.dirty = true;
    }

    fn push_line(&mut self, raw: &[u8], history: usize) {
        if let Some(line) = decode_line(raw) {
            self.lines.push(line);
            // Trim in batches rather than on every line
            if self.lines.len() > history + history / 10 {
                let excess = self.lines.len() - history;
                self.lines.drain(..excess);
            }
            self.dirty = true;
        }
    }

    fn clear(&mut self) {
        self.lines.clear();
        self.partial.clear();
        self.progress = None;
        self.dirty = true;
    }
}

pub struct DashboardContext {
    pub state: DashboardState,
    panels: Vec<WorkflowPanel>,
    projects: Vec<String>,
    classifier: Box<dyn StatusClassifier>,
    store: StateDir,
    history: usize,
}

impl DashboardContext {
    /// Seed every panel from whatever a previous run left on disk
    pub fn new(
        store: StateDir,
        workflows: &[Workflow],
        projects: &[String],
        classifier: Box<dyn StatusClassifier>,
        history: usize,
    ) -> Self {
        let workflows = Workflow::canonical(workflows);
        let history = history.max(1);
        let panels = workflows
            .iter()
            .map(|w| WorkflowPanel::load(&store, *w, history))
            .collect();

        let mut ctx = Self {
            state: DashboardState::new(workflows),
            panels,
            projects: projects.to_vec(),
            classifier,
            store,
            history,
        };
        ctx.recompute();
        ctx
    }

    pub fn panels(&self) -> &[WorkflowPanel] {
        &self.panels
    }

    pub fn projects(&self) -> &[String] {
        &self.projects
    }

    pub fn resumed(&self) -> Vec<Workflow> {
        self.panels.iter().filter(|p| p.resumed).map(|p| p.workflow).collect()
    }

    pub fn count(&self, status: SessionStatus) -> usize {
        self.panels.iter().filter(|p| p.status == status).count()
    }

    fn panel_mut(&mut self, workflow: Workflow) -> Option<&mut WorkflowPanel> {
        self.panels.iter_mut().find(|p| p.workflow == workflow)
    }

    pub fn apply_event(&mut self, event: SessionEvent) {
        let history = self.history;
        match event {
            SessionEvent::Abandoned { workflow } => {
                if let Some(panel) = self.panel_mut(workflow) {
                    panel.resumed = true;
                }
            }
            SessionEvent::StatusChanged { workflow, status } => {
                if let Some(panel) = self.panel_mut(workflow) {
                    // A fresh start truncates the log, so drop what was seeded
                    if status == SessionStatus::Running && panel.status != SessionStatus::Running {
                        panel.clear();
                    }
                    panel.status = status;
                }
            }
            SessionEvent::Output { workflow, stream, bytes } => {
                if let Some(panel) = self.panel_mut(workflow) {
                    panel.push_output(stream, &bytes, history);
                }
            }
        }
    }

    /// Poll-tick work: re-read progress beacons and re-derive changed summaries
    pub fn refresh(&mut self) {
        for panel in &mut self.panels {
            let progress = ProgressRecord::load(&self.store.progress_path(panel.workflow));
            if progress != panel.progress {
                panel.progress = progress;
                panel.dirty = true;
            }
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        for panel in self.panels.iter_mut().filter(|p| p.dirty) {
            panel.summary = summarize(
                self.classifier.as_ref(),
                &self.projects,
                panel.progress.as_ref(),
                &panel.lines,
            );
            panel.dirty = false;
        }
    }
}
