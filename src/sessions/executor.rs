//! Supervises one workflow's external session

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use uuid::Uuid;

use crate::config::{FixflowConfig, SessionCommand};
use crate::sessions::log_sink::{LogSink, SinkMode};
use crate::sessions::prompt::build_prompt;
use crate::sessions::{EventSender, OutputStream, SessionEvent};
use crate::state::StateDir;
use crate::workflow::{SessionStatus, Workflow};

const READ_CHUNK: usize = 8192;

/// Starts or resumes sessions and records their outcome
pub struct SessionExecutor {
    command: SessionCommand,
    workspace_dir: PathBuf,
    state: StateDir,
    events: EventSender,
}

impl SessionExecutor {
    pub fn new(
        command: SessionCommand,
        workspace_dir: PathBuf,
        state: StateDir,
        events: EventSender,
    ) -> Self {
        Self {
            command,
            workspace_dir,
            state,
            events,
        }
    }

    pub fn from_config(config: &FixflowConfig, events: EventSender) -> Self {
        Self::new(
            config.command.clone(),
            config.workspace_dir.clone(),
            config.state(),
            events,
        )
    }

    pub fn state(&self) -> &StateDir {
        &self.state
    }

    pub fn events(&self) -> &EventSender {
        &self.events
    }

    /// Run one session to completion. A `RUNNING` marker left by an earlier
    /// run means that session was abandoned, so it is resumed instead of
    /// restarted. Returns true iff the tool exited successfully.
    pub async fn run_session(&self, workflow: Workflow, projects: &[String]) -> bool {
        let resume = self.state.read_status(workflow).await == SessionStatus::Running;

        let status = match self.supervise(workflow, projects, resume).await {
            Ok(exit) if exit.success() => {
                tracing::info!(workflow = %workflow, "Session completed");
                SessionStatus::Completed
            }
            Ok(exit) => {
                tracing::warn!(workflow = %workflow, code = ?exit.code(), "Session failed");
                SessionStatus::Failed
            }
            Err(e) => {
                let message = format!("{:#}", e);
                tracing::error!(workflow = %workflow, error = %message, "Session could not run");
                SessionStatus::Failed
            }
        };

        if let Err(e) = self.state.write_status(workflow, status).await {
            tracing::error!(workflow = %workflow, error = %e, "Failed to record session status");
        }
        self.emit_status(workflow, status);

        status == SessionStatus::Completed
    }

    async fn supervise(
        &self,
        workflow: Workflow,
        projects: &[String],
        resume: bool,
    ) -> Result<ExitStatus> {
        let log_path = self.state.log_path(workflow);

        let (sink, sink_task, args) = if resume {
            let (sink, task) = LogSink::open(&log_path, SinkMode::Append, workflow, self.events.clone())
                .await
                .with_context(|| format!("Failed to open {}", log_path.display()))?;
            sink.note(resume_delimiter(Local::now())).await;

            let session_id = self.state.read_session_id(workflow).await;
            tracing::info!(workflow = %workflow, session_id = ?session_id, "Resuming abandoned session");
            self.emit_status(workflow, SessionStatus::Running);

            (sink, task, resume_args(&self.command, session_id.as_deref()))
        } else {
            self.state
                .write_status(workflow, SessionStatus::Running)
                .await
                .context("Failed to record RUNNING status")?;
            self.emit_status(workflow, SessionStatus::Running);

            // A progress beacon from an earlier run would misreport this one
            let _ = tokio::fs::remove_file(self.state.progress_path(workflow)).await;

            let prompt = build_prompt(workflow, projects, &self.state.progress_path(workflow));
            tokio::fs::write(self.state.prompt_path(workflow), &prompt)
                .await
                .context("Failed to write prompt")?;

            let session_id = match &self.command.session_id_flag {
                Some(_) => {
                    let id = Uuid::new_v4().to_string();
                    self.state
                        .write_session_id(workflow, &id)
                        .await
                        .context("Failed to record session id")?;
                    Some(id)
                }
                None => {
                    let _ = tokio::fs::remove_file(self.state.session_id_path(workflow)).await;
                    None
                }
            };

            let (sink, task) = LogSink::open(&log_path, SinkMode::Truncate, workflow, self.events.clone())
                .await
                .with_context(|| format!("Failed to open {}", log_path.display()))?;
            tracing::info!(workflow = %workflow, projects = projects.len(), "Starting fresh session");

            (sink, task, fresh_args(&self.command, session_id.as_deref(), &prompt))
        };

        let result = self.spawn_and_drain(workflow, &sink, args).await;
        if let Err(e) = &result {
            sink.note(format!("fixflow: {:#}", e)).await;
        }

        // Last handle gone: the writer flushes and closes the file
        drop(sink);
        if let Err(e) = sink_task.finish().await {
            tracing::warn!(workflow = %workflow, error = %e, "Log sink reported an error");
        }

        result
    }

    async fn spawn_and_drain(
        &self,
        workflow: Workflow,
        sink: &LogSink,
        args: Vec<String>,
    ) -> Result<ExitStatus> {
        let mut child = Command::new(&self.command.program)
            .args(&args)
            .current_dir(&self.workspace_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.command.program))?;

        tracing::debug!(workflow = %workflow, pid = ?child.id(), "Session process spawned");

        let stdout = child.stdout.take().context("stdout was not captured")?;
        let stderr = child.stderr.take().context("stderr was not captured")?;

        let (out, err, status) = tokio::join!(
            drain(stdout, OutputStream::Stdout, sink.clone()),
            drain(stderr, OutputStream::Stderr, sink.clone()),
            child.wait(),
        );

        for (stream, result) in [(OutputStream::Stdout, out), (OutputStream::Stderr, err)] {
            if let Err(e) = result {
                tracing::warn!(workflow = %workflow, stream = ?stream, error = %e, "Stream read failed");
            }
        }

        status.context("Failed to wait for session process")
    }

    fn emit_status(&self, workflow: Workflow, status: SessionStatus) {
        let _ = self.events.send(SessionEvent::StatusChanged { workflow, status });
    }
}

/// Copy a child stream into the sink chunk by chunk, as it arrives
async fn drain<R>(mut reader: R, stream: OutputStream, sink: LogSink) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; READ_CHUNK];
    let mut total = 0u64;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        total += n as u64;
        // Keep reading even without a sink so the child never stalls on a full pipe
        let _ = sink.write(stream, buf[..n].to_vec()).await;
    }

    Ok(total)
}

fn base_args(command: &SessionCommand) -> Vec<String> {
    command.args.iter().chain(command.grants.iter()).cloned().collect()
}

fn fresh_args(command: &SessionCommand, session_id: Option<&str>, prompt: &str) -> Vec<String> {
    let mut args = base_args(command);
    if let (Some(flag), Some(id)) = (&command.session_id_flag, session_id) {
        args.push(flag.clone());
        args.push(id.to_string());
    }
    if !command.prompt_flag.is_empty() {
        args.push(command.prompt_flag.clone());
    }
    args.push(prompt.to_string());
    args
}

fn resume_args(command: &SessionCommand, session_id: Option<&str>) -> Vec<String> {
    let mut args = base_args(command);
    match session_id {
        Some(id) if !command.resume_flag.is_empty() => {
            args.push(command.resume_flag.clone());
            args.push(id.to_string());
        }
        _ if !command.continue_flag.is_empty() => args.push(command.continue_flag.clone()),
        _ => {}
    }
    args
}

fn resume_delimiter(at: DateTime<Local>) -> String {
    format!(
        "\n===== fixflow: session resumed at {} =====\n",
        at.format("%Y-%m-%d %H:%M:%S")
    )
}
