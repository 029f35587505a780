//! Typed errors for failures that abort a run before any session starts

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixflowError {
    #[error("unknown workflow '{0}' (expected one of: type, build, test, lint)")]
    UnknownWorkflow(String),

    #[error("no workflows selected; pass --workflow or run once with a selection")]
    NoWorkflows,

    #[error("no projects selected; pass --project or run once with a selection")]
    NoProjects,

    #[error("failed to parse {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
