//! fixflow - Run fix workflows across your projects in parallel
//!
//! fixflow supervises one long-running external session per selected
//! workflow (type, build, test, lint), captures each session's output, and
//! shows live progress in a navigable terminal dashboard. An interrupted
//! run is resumed on the next launch.

pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod progress;
pub mod sessions;
pub mod state;
pub mod workflow;

// Re-export commonly used types
pub use config::{Config, FixflowConfig};
pub use error::FixflowError;
pub use progress::{ProgressRecord, ProjectStatus, StatusClassifier};
pub use sessions::{Orchestrator, RunSummary, SessionEvent};
pub use workflow::{SessionStatus, Workflow};
