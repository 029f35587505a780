//! Configuration file parsing and management

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::error::FixflowError;
use crate::progress::ClassifierKind;
use crate::state::StateDir;

pub const CONFIG_FILE: &str = ".fixflow.toml";

/// Global configuration loaded from .fixflow.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// State root, relative to the workspace
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// External tool that runs each session
    #[serde(default = "default_command")]
    pub command: String,

    /// Extra arguments placed before everything else
    #[serde(default)]
    pub args: Vec<String>,

    /// Flag preceding the instruction payload
    #[serde(default = "default_prompt_flag")]
    pub prompt_flag: String,

    /// Flag preceding a new session id (empty disables session ids)
    #[serde(default = "default_session_id_flag")]
    pub session_id_flag: String,

    /// Flag preceding a recorded session id on resume
    #[serde(default = "default_resume_flag")]
    pub resume_flag: String,

    /// Resume flag used when no session id was recorded
    #[serde(default = "default_continue_flag")]
    pub continue_flag: String,

    /// Dashboard poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Log lines kept in memory per dashboard panel
    #[serde(default = "default_log_history")]
    pub log_history: usize,

    /// Project status classification strategy
    #[serde(default)]
    pub classifier: ClassifierKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            command: default_command(),
            args: vec![],
            prompt_flag: default_prompt_flag(),
            session_id_flag: default_session_id_flag(),
            resume_flag: default_resume_flag(),
            continue_flag: default_continue_flag(),
            poll_interval: default_poll_interval(),
            log_history: default_log_history(),
            classifier: ClassifierKind::default(),
        }
    }
}

/// How the external tool is invoked
#[derive(Debug, Clone)]
pub struct SessionCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Permission/capability grants passed straight through
    pub grants: Vec<String>,
    pub prompt_flag: String,
    pub session_id_flag: Option<String>,
    pub resume_flag: String,
    pub continue_flag: String,
}

/// Runtime configuration for a fixflow run
#[derive(Debug, Clone)]
pub struct FixflowConfig {
    pub workspace_dir: PathBuf,
    pub state_dir: PathBuf,
    pub command: SessionCommand,
    pub poll_interval: Duration,
    pub log_history: usize,
    pub classifier: ClassifierKind,
}

impl From<Config> for FixflowConfig {
    fn from(config: Config) -> Self {
        Self {
            workspace_dir: PathBuf::from("."),
            state_dir: config.state_dir,
            command: SessionCommand {
                program: config.command,
                args: config.args,
                grants: vec![],
                prompt_flag: config.prompt_flag,
                session_id_flag: Some(config.session_id_flag).filter(|f| !f.is_empty()),
                resume_flag: config.resume_flag,
                continue_flag: config.continue_flag,
            },
            poll_interval: Duration::from_millis(config.poll_interval.max(1)),
            log_history: config.log_history.max(1),
            classifier: config.classifier,
        }
    }
}

impl FixflowConfig {
    /// Anchor relative paths at the workspace
    pub fn with_workspace_dir(mut self, dir: PathBuf) -> Self {
        if self.state_dir.is_relative() {
            self.state_dir = dir.join(&self.state_dir);
        }
        self.workspace_dir = dir;
        self
    }

    pub fn with_grants(mut self, grants: Vec<String>) -> Self {
        self.command.grants = grants;
        self
    }

    pub fn state(&self) -> StateDir {
        StateDir::new(&self.state_dir)
    }
}

/// Load configuration from .fixflow.toml in the workspace directory
pub fn load_config(workspace_dir: &Path) -> Result<Config, FixflowError> {
    let config_path = workspace_dir.join(CONFIG_FILE);

    if !config_path.exists() {
        tracing::debug!("No {} found, using defaults", CONFIG_FILE);
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(&config_path)?;
    let config: Config = toml::from_str(&contents).map_err(|e| FixflowError::Config {
        path: config_path.clone(),
        message: e.to_string(),
    })?;

    tracing::debug!("Loaded config from {}", config_path.display());
    Ok(config)
}

// Default values
fn default_state_dir() -> PathBuf { PathBuf::from(".fixflow") }
fn default_command() -> String { "claude".to_string() }
fn default_prompt_flag() -> String { "-p".to_string() }
fn default_session_id_flag() -> String { "--session-id".to_string() }
fn default_resume_flag() -> String { "--resume".to_string() }
fn default_continue_flag() -> String { "--continue".to_string() }
fn default_poll_interval() -> u64 { 200 }
fn default_log_history() -> usize { 5000 }

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.command, "claude");
        assert_eq!(config.poll_interval, 200);
        assert_eq!(config.state_dir, PathBuf::from(".fixflow"));
        assert_eq!(config.classifier, ClassifierKind::Heuristic);
    }

    #[test]
    fn test_fixflow_config_from_config() {
        let config = FixflowConfig::from(Config::default())
            .with_workspace_dir(PathBuf::from("/work"));
        assert_eq!(config.poll_interval, Duration::from_millis(200));
        assert_eq!(config.state_dir, PathBuf::from("/work/.fixflow"));
        assert_eq!(config.command.session_id_flag.as_deref(), Some("--session-id"));
    }

    #[test]
    fn test_empty_session_id_flag_disables_ids() {
        let config = Config {
            session_id_flag: String::new(),
            ..Config::default()
        };
        assert!(FixflowConfig::from(config).command.session_id_flag.is_none());
    }

    #[test]
    fn test_load_partial_config_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "command = \"my-agent\"\nargs = [\"--quiet\"]\nclassifier = \"progress-only\"\n",
        )
        .unwrap();

        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.command, "my-agent");
        assert_eq!(config.args, vec!["--quiet".to_string()]);
        assert_eq!(config.classifier, ClassifierKind::ProgressOnly);
        assert_eq!(config.resume_flag, "--resume");
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "poll_interval = \"fast\"").unwrap();
        assert!(matches!(load_config(dir.path()), Err(FixflowError::Config { .. })));
    }
}
