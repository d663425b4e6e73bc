//! Streaming transport between a test runner and a [`TestSession`].
//!
//! A [`TestRunner`] produces an [`OutputStream`] of raw text chunks. [`drive`]
//! pumps that stream into a session until it ends, fails, or is cancelled.

mod error;
mod process;

pub use error::RunnerError;
pub use process::ProcessRunner;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::results::SuiteStatus;
use crate::session::{RunEvent, RunId, TestSession};

/// Chunked runner output in emission order.
pub type OutputStream = Pin<Box<dyn Stream<Item = Result<String, RunnerError>> + Send>>;

/// Something that can execute a test suite and stream its output.
///
/// # Example
///
/// ```ignore
/// use testlens_core::runner::{ProcessRunner, TestRunner};
///
/// let runner = ProcessRunner::new(config.runner.clone());
/// let stream = runner.spawn(Some("tests::adds")).await?;
/// ```
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Start a run, optionally restricted by a name filter.
    async fn spawn(&self, filter: Option<&str>) -> Result<OutputStream, RunnerError>;

    /// Short name for logs and progress output.
    fn name(&self) -> &str;
}

#[async_trait]
impl TestRunner for Box<dyn TestRunner> {
    async fn spawn(&self, filter: Option<&str>) -> Result<OutputStream, RunnerError> {
        (**self).spawn(filter).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Replays a fixed list of chunks, optionally ending in a transport error.
#[derive(Debug, Clone, Default)]
pub struct StaticRunner {
    chunks: Vec<String>,
    error: Option<String>,
}

impl StaticRunner {
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            error: None,
        }
    }

    /// Replay a whole transcript as a single chunk.
    pub fn from_transcript(text: impl Into<String>) -> Self {
        let text: String = text.into();
        Self::new([text])
    }

    /// Fail with `message` after the last chunk.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

#[async_trait]
impl TestRunner for StaticRunner {
    async fn spawn(&self, _filter: Option<&str>) -> Result<OutputStream, RunnerError> {
        let mut items: Vec<Result<String, RunnerError>> =
            self.chunks.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.error {
            items.push(Err(RunnerError::Transport(message.clone())));
        }
        Ok(Box::pin(futures::stream::iter(items)))
    }

    fn name(&self) -> &str {
        "replay"
    }
}

/// Pump `stream` into `session` until it ends, errors, or `cancel` fires.
///
/// Events are forwarded to `events` as they are produced. Returns the
/// session's terminal status.
pub async fn drive(
    session: &mut TestSession,
    run: RunId,
    mut stream: OutputStream,
    cancel: CancellationToken,
    events: Option<&mpsc::UnboundedSender<RunEvent>>,
) -> SuiteStatus {
    let forward = |batch: Vec<RunEvent>| {
        if let Some(tx) = events {
            for event in batch {
                // A closed receiver only means nobody is watching progress.
                let _ = tx.send(event);
            }
        }
    };

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!(run = %run, "run cancelled");
                forward(session.stop(run));
                break;
            }

            next = stream.next() => match next {
                Some(Ok(chunk)) => forward(session.feed(run, &chunk)),
                Some(Err(e)) => {
                    warn!(run = %run, error = %e, "runner transport failed");
                    forward(session.fail(run, &e));
                    break;
                }
                None => {
                    forward(session.finish(run));
                    break;
                }
            },
        }
    }

    session.suite().status
}

/// Start a fresh run on `session`, spawn `runner`, and drive it to the end.
///
/// A spawn failure marks the run `Failed` and is returned to the caller.
pub async fn execute<R>(
    runner: &R,
    session: &mut TestSession,
    filter: Option<&str>,
    cancel: CancellationToken,
    events: Option<&mpsc::UnboundedSender<RunEvent>>,
) -> Result<SuiteStatus, RunnerError>
where
    R: TestRunner + ?Sized,
{
    let (run, started) = session.start_with_event();
    if let Some(tx) = events {
        let _ = tx.send(started);
    }

    let stream = match runner.spawn(filter).await {
        Ok(stream) => stream,
        Err(e) => {
            let batch = session.fail(run, &e);
            if let Some(tx) = events {
                for event in batch {
                    let _ = tx.send(event);
                }
            }
            return Err(e);
        }
    };

    info!(runner = runner.name(), run = %run, "driving test run");
    Ok(drive(session, run, stream, cancel, events).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::TestStatus;

    #[tokio::test]
    async fn test_drive_completes_on_stream_end() {
        let runner = StaticRunner::new([
            "test a ... ",
            "ok\n",
            "test result: ok. 1 passed; 0 failed; 0 ignored\n",
        ]);
        let mut session = TestSession::new();

        let status = execute(&runner, &mut session, None, CancellationToken::new(), None)
            .await
            .unwrap();

        assert_eq!(status, SuiteStatus::Completed);
        assert_eq!(session.suite().tests["a"].status, TestStatus::Passed);
        assert_eq!(session.suite().passed, 1);
    }

    #[tokio::test]
    async fn test_drive_fails_on_transport_error() {
        let runner = StaticRunner::new(["test a ... ok\n"]).with_error("pipe closed");
        let mut session = TestSession::new();

        let status = execute(&runner, &mut session, None, CancellationToken::new(), None)
            .await
            .unwrap();

        assert_eq!(status, SuiteStatus::Failed);
        assert_eq!(session.suite().passed, 1);
        assert!(session.suite().error.as_deref().unwrap().contains("pipe closed"));
    }

    #[tokio::test]
    async fn test_drive_stops_when_cancelled() {
        let runner = StaticRunner::new(["test a ... \n", "never seen\n"]);
        let mut session = TestSession::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let status = execute(&runner, &mut session, None, cancel, None).await.unwrap();

        assert_eq!(status, SuiteStatus::Aborted);
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_events_are_forwarded() {
        let runner = StaticRunner::new(["running 1 test\ntest a ... ok\n"]);
        let mut session = TestSession::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        execute(&runner, &mut session, None, CancellationToken::new(), Some(&tx))
            .await
            .unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert!(matches!(events.first(), Some(RunEvent::RunStarted { .. })));
        assert!(events.contains(&RunEvent::Planned { count: 1 }));
        assert_eq!(
            events.last(),
            Some(&RunEvent::RunFinished {
                status: SuiteStatus::Completed
            })
        );
    }
}
