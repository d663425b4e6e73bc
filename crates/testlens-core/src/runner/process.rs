//! Child-process transport.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use super::{OutputStream, RunnerError, TestRunner};
use crate::config::{RunnerConfig, DEFAULT_READ_CHUNK_SIZE};

type ChunkSender = mpsc::UnboundedSender<Result<String, RunnerError>>;

/// Runs the configured program and streams its stdout and stderr.
///
/// Each pipe is read in raw chunks and forwarded a line at a time, so output
/// from the two pipes can interleave only at line boundaries. A non-zero exit
/// status is not an error: failing tests exit non-zero.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    config: RunnerConfig,
    read_chunk_size: usize,
}

impl ProcessRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }

    /// Override the per-read buffer size.
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    fn command(&self, filter: Option<&str>) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(self.config.command_args(filter))
            .envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = self.config.cwd_path() {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

#[async_trait]
impl TestRunner for ProcessRunner {
    async fn spawn(&self, filter: Option<&str>) -> Result<OutputStream, RunnerError> {
        if self.config.program.trim().is_empty() {
            return Err(RunnerError::MissingProgram);
        }

        let args = self.config.command_args(filter);
        info!(program = %self.config.program, args = ?args, "spawning test runner");

        let mut child = self
            .command(filter)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or(RunnerError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(RunnerError::MissingPipe("stderr"))?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(pump(stdout, tx.clone(), self.read_chunk_size, "stdout"));
        tokio::spawn(pump(stderr, tx, self.read_chunk_size, "stderr"));

        // Dropping the stream kills a runner that is still going.
        let kill = CancellationToken::new();
        let guard = kill.clone().drop_guard();
        tokio::spawn(async move {
            let cancelled = tokio::select! {
                status = child.wait() => {
                    match status {
                        Ok(status) => info!(%status, "test runner exited"),
                        Err(e) => warn!(error = %e, "failed to wait for test runner"),
                    }
                    false
                }
                _ = kill.cancelled() => true,
            };
            if cancelled {
                match child.kill().await {
                    Ok(()) => info!("test runner killed"),
                    Err(e) => warn!(error = %e, "failed to kill test runner"),
                }
            }
        });

        Ok(Box::pin(ProcessOutput {
            inner: UnboundedReceiverStream::new(rx),
            _guard: guard,
        }))
    }

    fn name(&self) -> &str {
        &self.config.program
    }
}

/// Output of a spawned runner; kills the process when dropped.
struct ProcessOutput {
    inner: UnboundedReceiverStream<Result<String, RunnerError>>,
    _guard: DropGuard,
}

impl Stream for ProcessOutput {
    type Item = Result<String, RunnerError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

/// Read one pipe to EOF, forwarding complete lines.
async fn pump<R>(mut pipe: R, tx: ChunkSender, chunk_size: usize, label: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; chunk_size];
    let mut lines = LineAssembler::default();

    loop {
        match pipe.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if let Some(text) = lines.push(&buf[..n]) {
                    if tx.send(Ok(text)).is_err() {
                        debug!(pipe = label, "output receiver dropped");
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(pipe = label, error = %e, "read from runner failed");
                let _ = tx.send(Err(RunnerError::Io(e)));
                return;
            }
        }
    }

    if let Some(rest) = lines.finish() {
        let _ = tx.send(Ok(rest));
    }
}

/// Accumulates raw bytes and releases them at line boundaries.
///
/// Splitting only after `\n` keeps multi-byte UTF-8 sequences whole.
#[derive(Debug, Default)]
struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    /// Add bytes; returns every complete line seen so far, newlines included.
    fn push(&mut self, bytes: &[u8]) -> Option<String> {
        self.pending.extend_from_slice(bytes);
        let end = self.pending.iter().rposition(|b| *b == b'\n')? + 1;
        let complete: Vec<u8> = self.pending.drain(..end).collect();
        Some(String::from_utf8_lossy(&complete).into_owned())
    }

    /// Remaining bytes at EOF, terminated so they cannot join another pipe's line.
    fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let mut text = String::from_utf8_lossy(&self.pending).into_owned();
        text.push('\n');
        Some(text)
    }
}
