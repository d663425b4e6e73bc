//! Per-test and per-suite result state for one run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status of a single test within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    /// Not seen in runner output (yet).
    #[default]
    Pending,
    /// Started but not finished.
    Running,
    Passed,
    Failed,
    Ignored,
}

impl TestStatus {
    /// Returns true for outcomes the runner reported as final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TestStatus::Passed | TestStatus::Failed | TestStatus::Ignored)
    }

    /// Returns a short label for display.
    pub fn display_name(&self) -> &'static str {
        match self {
            TestStatus::Pending => "pending",
            TestStatus::Running => "running",
            TestStatus::Passed => "ok",
            TestStatus::Failed => "FAILED",
            TestStatus::Ignored => "ignored",
        }
    }
}

/// Lifecycle of a whole run.
///
/// `Aborted` and `Failed` are distinct terminal states so a stopped or broken
/// run is never reported as `Completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteStatus {
    #[default]
    Idle,
    Running,
    /// The runner's output stream ended normally.
    Completed,
    /// The run was stopped by the caller.
    Aborted,
    /// The transport failed mid-run; partial results are kept.
    Failed,
}

impl SuiteStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SuiteStatus::Completed | SuiteStatus::Aborted | SuiteStatus::Failed
        )
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SuiteStatus::Idle => "Idle",
            SuiteStatus::Running => "Running",
            SuiteStatus::Completed => "Completed",
            SuiteStatus::Aborted => "Aborted",
            SuiteStatus::Failed => "Failed",
        }
    }
}

/// Outcome of one test in the current run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub status: TestStatus,

    /// Duration in milliseconds, when the runner reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Output attributed to this test, ANSI-stripped.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output: String,
}

impl TestResult {
    pub fn running() -> Self {
        Self {
            status: TestStatus::Running,
            ..Self::default()
        }
    }
}

/// Aggregate state of one run.
///
/// Counters follow the per-test tally while a test binary is running and are
/// replaced by the runner's summary line once it arrives. `cargo test` prints
/// one summary per test binary, so summaries accumulate in `settled`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSuiteResult {
    /// Qualified test name (as the runner printed it) to result.
    pub tests: BTreeMap<String, TestResult>,

    pub passed: u32,
    pub failed: u32,
    pub ignored: u32,

    /// Tests announced by `running N tests` headers.
    pub planned: u32,

    /// Total reported duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    pub status: SuiteStatus,

    /// Transport error message for a `Failed` run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Sum of all summaries seen so far.
    #[serde(skip)]
    pub(crate) settled: Counts,

    /// Tally since the last summary.
    #[serde(skip)]
    pub(crate) live: Counts,
}

/// Passed / failed / ignored triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Counts {
    pub passed: u32,
    pub failed: u32,
    pub ignored: u32,
}

impl Counts {
    /// Field-wise sum, saturating at `u32::MAX`.
    fn plus(self, other: Counts) -> Counts {
        Counts {
            passed: self.passed.saturating_add(other.passed),
            failed: self.failed.saturating_add(other.failed),
            ignored: self.ignored.saturating_add(other.ignored),
        }
    }

    fn slot(&mut self, status: TestStatus) -> Option<&mut u32> {
        match status {
            TestStatus::Passed => Some(&mut self.passed),
            TestStatus::Failed => Some(&mut self.failed),
            TestStatus::Ignored => Some(&mut self.ignored),
            TestStatus::Pending | TestStatus::Running => None,
        }
    }
}

impl TestSuiteResult {
    /// Fresh aggregate for a run that has just started.
    pub fn running() -> Self {
        Self {
            status: SuiteStatus::Running,
            ..Self::default()
        }
    }

    /// Number of tests whose recorded status equals `status`.
    pub fn count(&self, status: TestStatus) -> usize {
        self.tests.values().filter(|r| r.status == status).count()
    }

    /// `passed + failed + ignored`.
    pub fn total(&self) -> u32 {
        self.passed
            .saturating_add(self.failed)
            .saturating_add(self.ignored)
    }

    /// True once the run has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// True if nothing failed and the run completed.
    pub fn is_success(&self) -> bool {
        self.status == SuiteStatus::Completed && self.failed == 0
    }

    /// Human-readable one-liner.
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}: {} passed; {} failed; {} ignored",
            self.status.display_name(),
            self.passed,
            self.failed,
            self.ignored
        );
        if let Some(ms) = self.duration_ms {
            line.push_str(&format!(" ({}ms)", ms));
        }
        if let Some(err) = &self.error {
            line.push_str(&format!(" - {}", err));
        }
        line
    }

    /// Set a test's status, keeping the live tally in step.
    pub(crate) fn set_status(&mut self, name: &str, status: TestStatus, duration_ms: Option<u64>) {
        let entry = self.tests.entry(name.to_string()).or_default();
        let previous = entry.status;
        entry.status = status;
        if duration_ms.is_some() {
            entry.duration_ms = duration_ms;
        }

        if previous != status {
            if let Some(slot) = self.live.slot(previous) {
                *slot = slot.saturating_sub(1);
            }
            if let Some(slot) = self.live.slot(status) {
                *slot = slot.saturating_add(1);
            }
        }
        self.sync_counters();
    }

    /// Fold a runner summary into the settled counts. The summary replaces the
    /// live tally of the binary it concludes.
    pub(crate) fn settle(&mut self, summary: Counts, duration_ms: Option<u64>) {
        self.settled = self.settled.plus(summary);
        self.live = Counts::default();

        if let Some(ms) = duration_ms {
            self.duration_ms = Some(self.duration_ms.unwrap_or(0).saturating_add(ms));
        }
        self.sync_counters();
    }

    fn sync_counters(&mut self) {
        let counts = self.settled.plus(self.live);
        self.passed = counts.passed;
        self.failed = counts.failed;
        self.ignored = counts.ignored;
    }
}
