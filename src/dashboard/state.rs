//! Selection cursor and expand/collapse set

use std::collections::BTreeSet;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::workflow::Workflow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Toggle,
    Expand,
    Collapse,
    ExpandAll,
    CollapseAll,
    Quit,
}

pub fn action_for_key(key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Action::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::Down),
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Tab => Some(Action::Toggle),
        KeyCode::Right | KeyCode::Char('l') => Some(Action::Expand),
        KeyCode::Left | KeyCode::Char('h') => Some(Action::Collapse),
        KeyCode::Char('a') => Some(Action::ExpandAll),
        KeyCode::Char('c') => Some(Action::CollapseAll),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        _ => None,
    }
}

/// Navigation state. `selected` always indexes `workflows` (when non-empty)
/// and `expanded` only ever holds members of `workflows`.
#[derive(Debug, Clone)]
pub struct DashboardState {
    workflows: Vec<Workflow>,
    selected: usize,
    expanded: BTreeSet<Workflow>,
}

impl DashboardState {
    /// Starts with every workflow expanded
    pub fn new(workflows: Vec<Workflow>) -> Self {
        let expanded = workflows.iter().copied().collect();
        Self {
            workflows,
            selected: 0,
            expanded,
        }
    }

    pub fn workflows(&self) -> &[Workflow] {
        &self.workflows
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_workflow(&self) -> Option<Workflow> {
        self.workflows.get(self.selected).copied()
    }

    pub fn is_expanded(&self, workflow: Workflow) -> bool {
        self.expanded.contains(&workflow)
    }

    pub fn expanded_count(&self) -> usize {
        self.expanded.len()
    }

    /// Apply one action. Returns true when the dashboard should quit.
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::Up => self.selected = self.selected.saturating_sub(1),
            Action::Down => {
                let last = self.workflows.len().saturating_sub(1);
                self.selected = (self.selected + 1).min(last);
            }
            Action::Toggle => {
                if let Some(workflow) = self.selected_workflow() {
                    if !self.expanded.remove(&workflow) {
                        self.expanded.insert(workflow);
                    }
                }
            }
            Action::Expand => {
                if let Some(workflow) = self.selected_workflow() {
                    self.expanded.insert(workflow);
                }
            }
            Action::Collapse => {
                if let Some(workflow) = self.selected_workflow() {
                    self.expanded.remove(&workflow);
                }
            }
            Action::ExpandAll => self.expanded = self.workflows.iter().copied().collect(),
            Action::CollapseAll => self.expanded.clear(),
            Action::Quit => return true,
        }
        false
    }
}
