//! Per-project status derivation
//!
//! A project's status within a workflow is recomputed from whatever is
//! readable right now: the progress beacon the external tool maintains, and
//! the session log. Nothing here ever fails; missing or malformed input
//! falls through to `Pending`.

use std::path::Path;
use std::sync::OnceLock;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lines after a project mention that may still carry its completion keyword
const ADJACENT_LINES: usize = 2;

// ============================================================================
// TYPES
// ============================================================================

/// Progress beacon written by the external session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(default)]
    pub current_project: String,
    #[serde(default)]
    pub current_task: i64,
    #[serde(default)]
    pub completed_projects: Vec<String>,
}

impl ProgressRecord {
    /// Read a beacon. Absent, partially written or malformed files yield `None`.
    pub fn load(path: &Path) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Ignoring malformed progress record");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectStatus {
    Pass,
    Running,
    Pending,
}

impl ProjectStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            ProjectStatus::Pass => "✓",
            ProjectStatus::Running => "◐",
            ProjectStatus::Pending => "○",
        }
    }
}

// ============================================================================
// CLASSIFIERS
// ============================================================================

/// Strategy that derives one project's status from a workflow's data
pub trait StatusClassifier: Send + Sync {
    fn classify(
        &self,
        project: &str,
        progress: Option<&ProgressRecord>,
        log_lines: &[String],
    ) -> ProjectStatus;
}

/// Which classifier a run uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierKind {
    #[default]
    Heuristic,
    ProgressOnly,
}

impl ClassifierKind {
    pub fn build(&self) -> Box<dyn StatusClassifier> {
        match self {
            ClassifierKind::Heuristic => Box::new(HeuristicClassifier),
            ClassifierKind::ProgressOnly => Box::new(ProgressOnlyClassifier),
        }
    }
}

/// Trusts only the progress beacon
pub struct ProgressOnlyClassifier;

impl StatusClassifier for ProgressOnlyClassifier {
    fn classify(
        &self,
        project: &str,
        progress: Option<&ProgressRecord>,
        _log_lines: &[String],
    ) -> ProjectStatus {
        from_progress(project, progress).unwrap_or(ProjectStatus::Pending)
    }
}

/// Progress beacon first, then log text matching
pub struct HeuristicClassifier;

impl StatusClassifier for HeuristicClassifier {
    fn classify(
        &self,
        project: &str,
        progress: Option<&ProgressRecord>,
        log_lines: &[String],
    ) -> ProjectStatus {
        from_progress(project, progress).unwrap_or_else(|| from_log(project, log_lines))
    }
}

fn from_progress(project: &str, progress: Option<&ProgressRecord>) -> Option<ProjectStatus> {
    let record = progress?;
    if record.completed_projects.iter().any(|p| p == project) {
        Some(ProjectStatus::Pass)
    } else if record.current_project == project {
        Some(ProjectStatus::Running)
    } else {
        None
    }
}

fn from_log(project: &str, lines: &[String]) -> ProjectStatus {
    let project = project.trim();
    if project.is_empty() {
        return ProjectStatus::Pending;
    }

    // Word-ish boundaries that still work for names like "@scope/pkg"
    let pattern = format!(r"(?i)(?:^|[^\w]){}(?:$|[^\w])", regex::escape(project));
    let name = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(_) => return ProjectStatus::Pending,
    };

    let mut mentioned = false;
    for (i, line) in lines.iter().enumerate() {
        if !name.is_match(line) {
            continue;
        }
        mentioned = true;

        let end = (i + ADJACENT_LINES + 1).min(lines.len());
        if lines[i..end].iter().any(|l| completion_re().is_match(l)) {
            return ProjectStatus::Pass;
        }
    }

    if mentioned {
        ProjectStatus::Running
    } else {
        ProjectStatus::Pending
    }
}

fn completion_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(done|completed|pass|passed)\b").expect("valid regex"))
}

/// Derive every project's status for one workflow, in project order
pub fn summarize(
    classifier: &dyn StatusClassifier,
    projects: &[String],
    progress: Option<&ProgressRecord>,
    log_lines: &[String],
) -> Vec<(String, ProjectStatus)> {
    projects
        .iter()
        .map(|p| (p.clone(), classifier.classify(p, progress, log_lines)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(String::from).collect()
    }

    fn sample_record() -> ProgressRecord {
        serde_json::from_str(
            r#"{"current_project":"web","current_task":2,"completed_projects":["api"]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_progress_record_drives_status() {
        let record = sample_record();
        let c = HeuristicClassifier;
        assert_eq!(c.classify("api", Some(&record), &[]), ProjectStatus::Pass);
        assert_eq!(c.classify("web", Some(&record), &[]), ProjectStatus::Running);
        assert_eq!(c.classify("docs", Some(&record), &[]), ProjectStatus::Pending);
    }

    #[test]
    fn test_progress_record_wins_over_log() {
        let record = sample_record();
        let log = lines("web: done");
        assert_eq!(
            HeuristicClassifier.classify("web", Some(&record), &log),
            ProjectStatus::Running
        );
    }

    #[test]
    fn test_log_fallback_when_project_not_in_record() {
        let record = sample_record();
        let log = lines("Checking docs...\nfound 3 errors");
        assert_eq!(
            HeuristicClassifier.classify("docs", Some(&record), &log),
            ProjectStatus::Running
        );
    }

    #[test]
    fn test_log_completion_keyword_nearby() {
        let log = lines("Working on API\nfixed 3 errors\nAll checks PASSED\nunrelated");
        assert_eq!(HeuristicClassifier.classify("api", None, &log), ProjectStatus::Pass);
    }

    #[test]
    fn test_log_completion_keyword_too_far_away() {
        let log = lines("Working on api\none\ntwo\nthree\ndone");
        assert_eq!(HeuristicClassifier.classify("api", None, &log), ProjectStatus::Running);
    }

    #[test]
    fn test_log_name_requires_word_boundary() {
        let log = lines("rapid build done");
        assert_eq!(HeuristicClassifier.classify("api", None, &log), ProjectStatus::Pending);

        let scoped = lines("@acme/ui: completed");
        assert_eq!(HeuristicClassifier.classify("@acme/ui", None, &scoped), ProjectStatus::Pass);
    }

    #[test]
    fn test_progress_only_ignores_log() {
        let log = lines("api done");
        assert_eq!(ProgressOnlyClassifier.classify("api", None, &log), ProjectStatus::Pending);
    }

    #[test]
    fn test_load_tolerates_missing_and_malformed_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lint-progress.json");
        assert_eq!(ProgressRecord::load(&path), None);

        std::fs::write(&path, "{\"current_project\": \"ap").unwrap();
        assert_eq!(ProgressRecord::load(&path), None);

        std::fs::write(&path, r#"{"completed_projects":["api"]}"#).unwrap();
        let record = ProgressRecord::load(&path).unwrap();
        assert_eq!(record.completed_projects, vec!["api".to_string()]);
        assert_eq!(record.current_project, "");
    }

    #[test]
    fn test_summarize_keeps_project_order() {
        let projects = vec!["web".to_string(), "api".to_string(), "docs".to_string()];
        let summary = summarize(&HeuristicClassifier, &projects, Some(&sample_record()), &[]);
        let statuses: Vec<ProjectStatus> = summary.iter().map(|(_, s)| *s).collect();
        assert_eq!(
            statuses,
            vec![ProjectStatus::Running, ProjectStatus::Pass, ProjectStatus::Pending]
        );
    }
}
