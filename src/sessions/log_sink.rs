//! Single-writer log sink
//!
//! One task owns the log file handle. Stream drains send it each chunk as
//! soon as the child produces it, tagged with its stream, so a prompt with no
//! trailing newline still reaches the log. Chunks from stdout and stderr land
//! in arrival order. Each chunk written is also forwarded to the session
//! event channel.

use std::io;
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::sessions::{EventSender, OutputStream, SessionEvent};
use crate::workflow::Workflow;

const SINK_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    /// Start a fresh log
    Truncate,
    /// Extend the existing log (resumed session)
    Append,
}

#[derive(Debug)]
struct LogChunk {
    stream: OutputStream,
    bytes: Vec<u8>,
}

/// Producer handle. The file is released once every clone is dropped.
#[derive(Clone)]
pub struct LogSink {
    tx: mpsc::Sender<LogChunk>,
}

/// The writer task; `finish` waits for the final flush
pub struct LogSinkTask {
    handle: JoinHandle<io::Result<u64>>,
}

impl LogSink {
    pub async fn open(
        path: &Path,
        mode: SinkMode,
        workflow: Workflow,
        events: EventSender,
    ) -> io::Result<(LogSink, LogSinkTask)> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            SinkMode::Truncate => options.write(true).truncate(true),
            SinkMode::Append => options.append(true),
        };
        let file = options.open(path).await?;

        let (tx, rx) = mpsc::channel(SINK_CAPACITY);
        let handle = tokio::spawn(run_sink(file, rx, workflow, events));

        Ok((LogSink { tx }, LogSinkTask { handle }))
    }

    /// Queue bytes for the log. Returns false once the writer has gone away.
    pub async fn write(&self, stream: OutputStream, bytes: Vec<u8>) -> bool {
        self.tx.send(LogChunk { stream, bytes }).await.is_ok()
    }

    /// Queue a line authored by fixflow itself
    pub async fn note(&self, text: impl Into<String>) -> bool {
        let mut text = text.into();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        self.write(OutputStream::Supervisor, text.into_bytes()).await
    }
}

impl LogSinkTask {
    /// Total bytes written. Only completes after all `LogSink` handles are dropped.
    pub async fn finish(self) -> io::Result<u64> {
        self.handle.await.map_err(io::Error::other)?
    }
}

async fn run_sink(
    mut file: File,
    mut rx: mpsc::Receiver<LogChunk>,
    workflow: Workflow,
    events: EventSender,
) -> io::Result<u64> {
    let mut written = 0u64;
    let mut failure: Option<io::Error> = None;

    while let Some(chunk) = rx.recv().await {
        // Keep draining after a write error so producers never block
        if failure.is_none() {
            let result = async {
                file.write_all(&chunk.bytes).await?;
                file.flush().await
            }
            .await;

            match result {
                Ok(()) => written += chunk.bytes.len() as u64,
                Err(e) => {
                    tracing::warn!(workflow = %workflow, error = %e, "Log write failed");
                    failure = Some(e);
                }
            }
        }

        let _ = events.send(SessionEvent::Output {
            workflow,
            stream: chunk.stream,
            bytes: chunk.bytes,
        });
    }

    file.flush().await?;
    match failure {
        Some(e) => Err(e),
        None => Ok(written),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_truncate_replaces_previous_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("build.log");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale output\n").unwrap();

        let (events, _rx) = mpsc::unbounded_channel();
        let (sink, task) = LogSink::open(&path, SinkMode::Truncate, Workflow::Build, events)
            .await
            .unwrap();
        assert!(sink.write(OutputStream::Stdout, b"fresh\n".to_vec()).await);
        drop(sink);

        assert_eq!(task.finish().await.unwrap(), 6);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[tokio::test]
    async fn test_append_extends_previous_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lint.log");
        std::fs::write(&path, "before\n").unwrap();

        let (events, _rx) = mpsc::unbounded_channel();
        let (sink, task) = LogSink::open(&path, SinkMode::Append, Workflow::Lint, events)
            .await
            .unwrap();
        sink.note("marker").await;
        sink.write(OutputStream::Stderr, b"after\n".to_vec()).await;
        drop(sink);
        task.finish().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "before\nmarker\nafter\n");
    }

    #[tokio::test]
    async fn test_written_chunks_are_forwarded_as_events() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("type.log");

        let (events, mut rx) = mpsc::unbounded_channel();
        let (sink, task) = LogSink::open(&path, SinkMode::Truncate, Workflow::Type, events)
            .await
            .unwrap();
        sink.write(OutputStream::Stdout, b"one\nhalf".to_vec()).await;
        sink.write(OutputStream::Stderr, b"two\n".to_vec()).await;
        drop(sink);
        task.finish().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\nhalftwo\n");

        let mut seen = vec![];
        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::Output { workflow, stream, bytes } = event {
                assert_eq!(workflow, Workflow::Type);
                seen.push((stream, bytes));
            }
        }
        assert_eq!(
            seen,
            vec![
                (OutputStream::Stdout, b"one\nhalf".to_vec()),
                (OutputStream::Stderr, b"two\n".to_vec()),
            ]
        );
    }
}
