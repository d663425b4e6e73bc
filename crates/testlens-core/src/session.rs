//! Run lifecycle: one [`TestSession`] owns exactly one run's state.
//!
//! A run is fed raw text chunks in transport order. Each chunk is appended to
//! the raw transcript, split into complete lines (a trailing partial line is
//! held for the next chunk), ANSI-stripped, and then applied once to the
//! suite aggregate and once to the output correlator.
//!
//! Starting a new run replaces all previous state. Chunks tagged with a
//! stale [`RunId`] are ignored, so a superseded run cannot leak into the
//! current one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::correlator::{resolve_key, strip_ansi, Correlator, MatchTier, Span};
use crate::discovery::TestFunction;
use crate::parser::LineEvent;
use crate::results::{SuiteStatus, TestStatus, TestSuiteResult};

/// Identifies one run of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Progress notifications produced while a run is fed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    RunStarted {
        run: RunId,
    },
    /// A `running N tests` header.
    Planned {
        count: u32,
    },
    TestStarted {
        name: String,
    },
    TestFinished {
        name: String,
        status: TestStatus,
        duration_ms: Option<u64>,
    },
    /// A runner summary line; counters are the suite's cumulative totals.
    Summary {
        passed: u32,
        failed: u32,
        ignored: u32,
    },
    /// One ANSI-stripped line, with the test it was attributed to.
    Output {
        test: Option<String>,
        line: String,
    },
    RunFinished {
        status: SuiteStatus,
    },
}

/// A discovered test resolved against the current run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestView {
    /// The runner's name for the test, if one matched.
    pub key: Option<String>,
    pub tier: Option<MatchTier>,
    pub status: TestStatus,
    pub duration_ms: Option<u64>,
    pub output: String,
}

impl TestView {
    fn pending() -> Self {
        Self {
            key: None,
            tier: None,
            status: TestStatus::Pending,
            duration_ms: None,
            output: String::new(),
        }
    }
}

/// State of the current run.
#[derive(Debug, Default)]
pub struct TestSession {
    run: Option<RunId>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    suite: TestSuiteResult,
    correlator: Correlator,
    transcript: String,
    partial: String,
}

impl TestSession {
    /// Creates an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run, discarding everything from the previous one.
    pub fn start(&mut self) -> RunId {
        if let Some(prev) = self.run.filter(|_| !self.suite.is_terminal()) {
            info!(run = %prev, "superseding in-flight run");
        }

        let run = RunId::new();
        *self = Self {
            run: Some(run),
            started_at: Some(Utc::now()),
            suite: TestSuiteResult::running(),
            ..Self::default()
        };
        info!(run = %run, "test run started");
        run
    }

    /// Start a new run and return its id plus the `RunStarted` event.
    pub fn start_with_event(&mut self) -> (RunId, RunEvent) {
        let run = self.start();
        (run, RunEvent::RunStarted { run })
    }

    /// True if `run` is the active, non-terminal run.
    pub fn is_active(&self, run: RunId) -> bool {
        self.run == Some(run) && self.suite.status == SuiteStatus::Running
    }

    /// Feed a raw chunk of runner output.
    pub fn feed(&mut self, run: RunId, chunk: &str) -> Vec<RunEvent> {
        if !self.is_active(run) {
            debug!(run = %run, "ignoring chunk for inactive run");
            return Vec::new();
        }

        self.transcript.push_str(chunk);
        self.partial.push_str(chunk);

        let mut buffered = std::mem::take(&mut self.partial);
        let mut consumed = 0;
        let mut events = Vec::new();
        for piece in buffered.split_inclusive('\n') {
            let Some(line) = piece.strip_suffix('\n') else {
                break;
            };
            consumed += piece.len();
            events.extend(self.process_line(line.trim_end_matches('\r')));
        }

        // Keep the unterminated tail for the next chunk.
        buffered.drain(..consumed);
        self.partial = buffered;
        events
    }

    /// Feed one complete line (without its terminator).
    pub fn feed_line(&mut self, run: RunId, line: &str) -> Vec<RunEvent> {
        let mut chunk = String::with_capacity(line.len() + 1);
        chunk.push_str(line);
        chunk.push('\n');
        self.feed(run, &chunk)
    }

    /// The output stream ended normally.
    pub fn finish(&mut self, run: RunId) -> Vec<RunEvent> {
        self.terminate(run, SuiteStatus::Completed, None)
    }

    /// The caller stopped the run. Open output is still flushed.
    pub fn stop(&mut self, run: RunId) -> Vec<RunEvent> {
        self.terminate(run, SuiteStatus::Aborted, None)
    }

    /// The transport failed. Partial results are kept.
    pub fn fail(&mut self, run: RunId, error: impl fmt::Display) -> Vec<RunEvent> {
        self.terminate(run, SuiteStatus::Failed, Some(error.to_string()))
    }

    pub fn run_id(&self) -> Option<RunId> {
        self.run
    }

    /// Current aggregate.
    pub fn suite(&self) -> &TestSuiteResult {
        &self.suite
    }

    /// Everything the runner printed, ANSI codes included.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Per-test output map.
    pub fn spans(&self) -> &BTreeMap<String, String> {
        self.correlator.spans()
    }

    /// Output recorded under an exact runner name.
    pub fn output_for_key(&self, name: &str) -> Option<&str> {
        self.correlator.output_for(name)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Wall-clock time of the run so far, or of the whole run once finished.
    pub fn elapsed_ms(&self) -> Option<i64> {
        let start = self.started_at?;
        let end = self.finished_at.unwrap_or_else(Utc::now);
        Some((end - start).num_milliseconds())
    }

    /// Resolve a discovered test against this run's results.
    ///
    /// Falls back from exact qualified name to short name to substring. With
    /// no match the test is reported as pending with no output.
    pub fn lookup(&self, test: &TestFunction) -> TestView {
        self.lookup_name(&test.qualified_name())
    }

    /// [`lookup`](Self::lookup) by qualified name.
    pub fn lookup_name(&self, qualified: &str) -> TestView {
        let Some((key, tier)) = resolve_key(qualified, self.suite.tests.keys().map(String::as_str))
        else {
            return TestView::pending();
        };

        let result = &self.suite.tests[key];
        TestView {
            key: Some(key.to_string()),
            tier: Some(tier),
            status: result.status,
            duration_ms: result.duration_ms,
            output: result.output.clone(),
        }
    }

    fn process_line(&mut self, raw: &str) -> Vec<RunEvent> {
        let line = strip_ansi(raw).into_owned();
        let event = self.suite.apply_line(&line);
        let committed = self.correlator.observe(&line, event.as_ref());

        let owner = self
            .correlator
            .current()
            .map(String::from)
            .or_else(|| committed.last().map(|s| s.name.clone()));
        for span in committed {
            self.attach(span);
        }

        let mut events = Vec::new();
        if let Some(event) = event {
            events.extend(self.progress_event(event));
        }
        events.push(RunEvent::Output { test: owner, line });
        events
    }

    fn progress_event(&self, event: LineEvent) -> Option<RunEvent> {
        match event {
            LineEvent::Started { name } => Some(RunEvent::TestStarted { name }),
            LineEvent::Finished { name, .. } => {
                let result = self.suite.tests.get(&name)?;
                Some(RunEvent::TestFinished {
                    status: result.status,
                    duration_ms: result.duration_ms,
                    name,
                })
            }
            LineEvent::Summary { .. } => Some(RunEvent::Summary {
                passed: self.suite.passed,
                failed: self.suite.failed,
                ignored: self.suite.ignored,
            }),
            LineEvent::Planned { count } => Some(RunEvent::Planned { count }),
            LineEvent::FailureHeader { .. } | LineEvent::FailureListStart => None,
        }
    }

    /// Copy a committed span onto the test's result.
    fn attach(&mut self, span: Span) {
        self.suite
            .tests
            .entry(span.name)
            .or_default()
            .output
            .push_str(&span.text);
    }

    fn terminate(
        &mut self,
        run: RunId,
        status: SuiteStatus,
        error: Option<String>,
    ) -> Vec<RunEvent> {
        if !self.is_active(run) {
            debug!(run = %run, status = ?status, "ignoring terminal transition for inactive run");
            return Vec::new();
        }

        let mut events = Vec::new();
        if !self.partial.is_empty() {
            let rest = std::mem::take(&mut self.partial);
            events.extend(self.process_line(rest.trim_end_matches('\r')));
        }
        if let Some(span) = self.correlator.finish() {
            debug!(test = %span.name, "flushing open span at end of run");
            self.attach(span);
        }

        self.suite.status = status;
        self.suite.error = error;
        self.finished_at = Some(Utc::now());

        info!(
            run = %run,
            status = status.display_name(),
            passed = self.suite.passed,
            failed = self.suite.failed,
            ignored = self.suite.ignored,
            "test run finished"
        );

        events.push(RunEvent::RunFinished { status });
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_lines_are_buffered_across_chunks() {
        let mut session = TestSession::new();
        let run = session.start();

        session.feed(run, "test tests::adds ... ");
        assert!(session.suite().tests.is_empty());

        session.feed(run, "ok\r\ntest tests::subs ");
        assert_eq!(session.suite().tests["tests::adds"].status, TestStatus::Passed);

        session.feed(run, "... FAILED\n");
        assert_eq!(session.suite().tests["tests::subs"].status, TestStatus::Failed);
        assert_eq!(
            session.transcript(),
            "test tests::adds ... ok\r\ntest tests::subs ... FAILED\n"
        );
    }

    #[test]
    fn test_large_chunk_is_split_in_one_pass() {
        let mut session = TestSession::new();
        let run = session.start();

        let mut chunk = String::new();
        for i in 0..10_000 {
            chunk.push_str(&format!("test t{i} ... ok\r\n"));
        }
        chunk.push_str("test tail ... ");
        session.feed(run, &chunk);

        assert_eq!(session.suite().tests.len(), 10_000);
        assert_eq!(session.suite().passed, 10_000);
        assert_eq!(session.suite().tests["t9999"].status, TestStatus::Passed);
        assert!(!session.suite().tests.contains_key("tail"));

        session.feed(run, "FAILED\n");
        assert_eq!(session.suite().tests["tail"].status, TestStatus::Failed);
        assert_eq!(session.suite().tests.len(), 10_001);
    }

    #[test]
    fn test_ansi_is_stripped_before_parsing_but_kept_in_transcript() {
        let mut session = TestSession::new();
        let run = session.start();
        session.feed_line(run, "test a ... \x1b[32mok\x1b[0m");

        assert_eq!(session.suite().tests["a"].status, TestStatus::Passed);
        assert_eq!(session.output_for_key("a"), Some("test a ... ok\n"));
        assert!(session.transcript().contains('\x1b'));
    }

    #[test]
    fn test_trailing_partial_line_is_flushed_on_finish() {
        let mut session = TestSession::new();
        let run = session.start();
        session.feed(run, "test a ... \nstill writing");

        let events = session.finish(run);
        assert!(matches!(
            events.last(),
            Some(RunEvent::RunFinished {
                status: SuiteStatus::Completed
            })
        ));
        assert_eq!(session.output_for_key("a"), Some("test a ... \nstill writing\n"));
    }

    #[test]
    fn test_stale_run_is_ignored() {
        let mut session = TestSession::new();
        let old = session.start();
        session.feed_line(old, "test a ... ok");

        let new = session.start();
        assert!(session.suite().tests.is_empty());
        assert!(session.transcript().is_empty());

        assert!(session.feed_line(old, "test b ... ok").is_empty());
        assert!(session.stop(old).is_empty());
        assert_eq!(session.suite().status, SuiteStatus::Running);

        session.feed_line(new, "test c ... ok");
        assert_eq!(session.suite().tests.len(), 1);
    }

    #[test]
    fn test_stop_marks_run_aborted_and_flushes() {
        let mut session = TestSession::new();
        let run = session.start();
        session.feed_line(run, "test slow ... ");
        session.feed_line(run, "working");

        session.stop(run);
        assert_eq!(session.suite().status, SuiteStatus::Aborted);
        assert_eq!(
            session.suite().tests["slow"].output,
            "test slow ... \nworking\n"
        );
        assert!(session.feed_line(run, "late").is_empty());
    }

    #[test]
    fn test_fail_keeps_partial_counts() {
        let mut session = TestSession::new();
        let run = session.start();
        session.feed_line(run, "test a ... ok");
        session.feed_line(run, "test b ... FAILED");

        session.fail(run, "connection reset");
        let suite = session.suite();
        assert_eq!(suite.status, SuiteStatus::Failed);
        assert_eq!(suite.error.as_deref(), Some("connection reset"));
        assert_eq!((suite.passed, suite.failed), (1, 1));
    }

    #[test]
    fn test_lookup_falls_back_to_pending() {
        let mut session = TestSession::new();
        let run = session.start();
        session.feed_line(run, "test adds_correctly ... ok");

        let found = session.lookup_name("tests::adds_correctly");
        assert_eq!(found.key.as_deref(), Some("adds_correctly"));
        assert_eq!(found.tier, Some(MatchTier::ShortName));
        assert_eq!(found.status, TestStatus::Passed);

        let missing = session.lookup_name("tests::unrelated");
        assert_eq!(missing, TestView::pending());
    }

    #[test]
    fn test_events_follow_lines() {
        let mut session = TestSession::new();
        let (run, started) = session.start_with_event();
        assert_eq!(started, RunEvent::RunStarted { run });

        let events = session.feed_line(run, "running 1 test");
        assert_eq!(events[0], RunEvent::Planned { count: 1 });

        let events = session.feed_line(run, "test a ... ok <0.002s>");
        assert_eq!(
            events[0],
            RunEvent::TestFinished {
                name: "a".into(),
                status: TestStatus::Passed,
                duration_ms: Some(2),
            }
        );
        assert_eq!(
            events[1],
            RunEvent::Output {
                test: Some("a".into()),
                line: "test a ... ok <0.002s>".into(),
            }
        );
    }
}
