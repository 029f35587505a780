//! Instruction payload for a fresh session

use std::fmt::Write;
use std::path::Path;

use crate::workflow::Workflow;

/// Build the prompt handed to the external tool: the workflow's action and
/// instructions, one TODO line per project, and the progress beacon protocol.
pub fn build_prompt(workflow: Workflow, projects: &[String], progress_path: &Path) -> String {
    let mut prompt = format!(
        "{} in the following {} project(s).\n\n{}\n\nTODO:\n",
        workflow.action(),
        projects.len(),
        workflow.instructions()
    );

    for project in projects {
        let _ = writeln!(prompt, "- [ ] {}", project);
    }

    let _ = write!(
        prompt,
        "\nProgress tracking:\n\
         Work through the projects in the order listed. Whenever you start or finish a \
         project, overwrite {} with JSON of exactly this shape:\n\
         {{\"current_project\": \"<project in progress>\", \"current_task\": <1-based position \
         of that project in the TODO list>, \"completed_projects\": [\"<every finished project>\"]}}\n\
         When a project is finished, print \"<project>: done\" on its own line.\n",
        progress_path.display()
    );

    prompt
}
