//! Workflow kinds and the persisted session status

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::FixflowError;

// ============================================================================
// WORKFLOW
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Workflow {
    Type,
    Build,
    Test,
    Lint,
}

impl Workflow {
    /// Canonical presentation order
    pub const ALL: [Workflow; 4] = [Workflow::Type, Workflow::Build, Workflow::Test, Workflow::Lint];

    pub fn as_str(&self) -> &'static str {
        match self {
            Workflow::Type => "type",
            Workflow::Build => "build",
            Workflow::Test => "test",
            Workflow::Lint => "lint",
        }
    }

    /// Human-readable action, used as the first line of the session prompt
    pub fn action(&self) -> &'static str {
        match self {
            Workflow::Type => "Fix all type errors",
            Workflow::Build => "Fix all build errors",
            Workflow::Test => "Fix all failing tests",
            Workflow::Lint => "Fix all lint errors",
        }
    }

    pub fn instructions(&self) -> &'static str {
        match self {
            Workflow::Type => {
                "Run the type checker for each project, fix every reported type error at its \
                 source, and re-run the checker until it reports no errors. Do not silence \
                 errors with casts or ignore comments."
            }
            Workflow::Build => {
                "Build each project, fix every compilation or bundling error, and rebuild until \
                 the build succeeds. Keep changes minimal and do not remove functionality."
            }
            Workflow::Test => {
                "Run the test suite for each project, fix the code (or the test, if the test is \
                 wrong) for every failure, and re-run until all tests pass. Do not skip or \
                 delete tests to make them pass."
            }
            Workflow::Lint => {
                "Run the linter for each project, fix every reported problem, and re-run until \
                 the linter is clean. Prefer real fixes over disabling rules."
            }
        }
    }

    /// Restrict a selection to the canonical order, dropping duplicates
    pub fn canonical(selected: &[Workflow]) -> Vec<Workflow> {
        Self::ALL
            .iter()
            .copied()
            .filter(|w| selected.contains(w))
            .collect()
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Workflow {
    type Err = FixflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "type" | "types" => Ok(Workflow::Type),
            "build" => Ok(Workflow::Build),
            "test" | "tests" => Ok(Workflow::Test),
            "lint" => Ok(Workflow::Lint),
            other => Err(FixflowError::UnknownWorkflow(other.to_string())),
        }
    }
}

// ============================================================================
// SESSION STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "PENDING",
            SessionStatus::Running => "RUNNING",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Failed => "FAILED",
        }
    }

    /// Parse a status marker. Anything unrecognised reads as `Pending`.
    pub fn parse_marker(s: &str) -> Self {
        match s.trim() {
            "RUNNING" => SessionStatus::Running,
            "COMPLETED" => SessionStatus::Completed,
            "FAILED" => SessionStatus::Failed,
            _ => SessionStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "○",
            SessionStatus::Running => "◐",
            SessionStatus::Completed => "✓",
            SessionStatus::Failed => "✗",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
