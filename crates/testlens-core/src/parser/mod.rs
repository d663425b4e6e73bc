//! Runner output line parser.
//!
//! [`classify_line`] recognises the handful of line shapes a libtest-style
//! runner prints. [`TestSuiteResult::apply_line`] folds one line into the
//! running aggregate. Unrecognised lines are not errors; they simply leave
//! the structured state untouched.

mod patterns;

use std::sync::LazyLock;

use regex::Regex;

use crate::results::{Counts, TestStatus, TestSuiteResult};
use patterns::{
    BARE_DURATION, BRACKETED_DURATION, FAILURE_HEADER, FAILURE_LIST, PLANNED, SHOULD_PANIC_SUFFIX,
    SUMMARY_COUNTS, SUMMARY_DURATION, TEST_FINISHED, TEST_STARTED,
};

static TEST_STARTED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(TEST_STARTED).unwrap());
static TEST_FINISHED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(TEST_FINISHED).unwrap());
static SUMMARY_COUNTS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(SUMMARY_COUNTS).unwrap());
static SUMMARY_DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SUMMARY_DURATION).unwrap());
static PLANNED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(PLANNED).unwrap());
static FAILURE_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(FAILURE_HEADER).unwrap());
static BRACKETED_DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(BRACKETED_DURATION).unwrap());
static BARE_DURATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(BARE_DURATION).unwrap());

/// Final outcome token on a "test finished" line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Failed,
    Ignored,
}

impl Outcome {
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "ok" => Some(Outcome::Ok),
            "failed" => Some(Outcome::Failed),
            "ignored" => Some(Outcome::Ignored),
            _ => None,
        }
    }

    pub fn status(&self) -> TestStatus {
        match self {
            Outcome::Ok => TestStatus::Passed,
            Outcome::Failed => TestStatus::Failed,
            Outcome::Ignored => TestStatus::Ignored,
        }
    }
}

/// A recognised runner output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// `test NAME ...`
    Started { name: String },
    /// `test NAME ... ok|FAILED|ignored`
    Finished {
        name: String,
        outcome: Outcome,
        duration_ms: Option<u64>,
    },
    /// `test result: ... N passed; M failed; K ignored ...`
    Summary {
        passed: u32,
        failed: u32,
        ignored: u32,
        duration_ms: Option<u64>,
    },
    /// `running N tests`
    Planned { count: u32 },
    /// `---- NAME stdout ----`
    FailureHeader { name: String },
    /// `failures:`
    FailureListStart,
}

/// Classify one ANSI-stripped line. Returns `None` for free text.
pub fn classify_line(line: &str) -> Option<LineEvent> {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(caps) = TEST_FINISHED_RE.captures(line) {
        let outcome = Outcome::parse(&caps[2])?;
        return Some(LineEvent::Finished {
            name: clean_name(&caps[1]),
            outcome,
            duration_ms: parse_trailing_duration(&caps[3]),
        });
    }

    if let Some(caps) = TEST_STARTED_RE.captures(line) {
        return Some(LineEvent::Started {
            name: clean_name(&caps[1]),
        });
    }

    if let Some(caps) = SUMMARY_COUNTS_RE.captures(line) {
        return Some(LineEvent::Summary {
            passed: caps[1].parse().unwrap_or(0),
            failed: caps[2].parse().unwrap_or(0),
            ignored: caps[3].parse().unwrap_or(0),
            duration_ms: SUMMARY_DURATION_RE
                .captures(line)
                .and_then(|c| seconds_to_millis(&c[1])),
        });
    }

    if let Some(caps) = PLANNED_RE.captures(line.trim()) {
        return Some(LineEvent::Planned {
            count: caps[1].parse().unwrap_or(0),
        });
    }

    if let Some(caps) = FAILURE_HEADER_RE.captures(line.trim()) {
        return Some(LineEvent::FailureHeader {
            name: clean_name(&caps[1]),
        });
    }

    if line.trim() == FAILURE_LIST {
        return Some(LineEvent::FailureListStart);
    }

    None
}

/// Reducer form: fold `line` into `suite` and return the updated aggregate.
pub fn parse_line(line: &str, mut suite: TestSuiteResult) -> TestSuiteResult {
    suite.apply_line(line);
    suite
}

impl TestSuiteResult {
    /// Fold one line into this aggregate, returning the recognised event.
    pub fn apply_line(&mut self, line: &str) -> Option<LineEvent> {
        let event = classify_line(line)?;
        self.apply_event(&event);
        Some(event)
    }

    /// Apply an already-classified event.
    pub fn apply_event(&mut self, event: &LineEvent) {
        match event {
            LineEvent::Started { name } => {
                let status = self.tests.get(name).map(|r| r.status);
                if !matches!(status, Some(s) if s.is_terminal()) {
                    self.set_status(name, TestStatus::Running, None);
                }
            }
            LineEvent::Finished {
                name,
                outcome,
                duration_ms,
            } => {
                self.set_status(name, outcome.status(), *duration_ms);
            }
            LineEvent::Summary {
                passed,
                failed,
                ignored,
                duration_ms,
            } => {
                self.settle(
                    Counts {
                        passed: *passed,
                        failed: *failed,
                        ignored: *ignored,
                    },
                    *duration_ms,
                );
            }
            LineEvent::Planned { count } => {
                self.planned = self.planned.saturating_add(*count);
            }
            LineEvent::FailureHeader { .. } | LineEvent::FailureListStart => {}
        }
    }
}

fn clean_name(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(SHOULD_PANIC_SUFFIX)
        .trim()
        .to_string()
}

fn parse_trailing_duration(rest: &str) -> Option<u64> {
    BRACKETED_DURATION_RE
        .captures(rest)
        .or_else(|| BARE_DURATION_RE.captures(rest))
        .and_then(|c| seconds_to_millis(&c[1]))
}

/// Fractional seconds to milliseconds, rounding half away from zero.
pub fn seconds_to_millis(literal: &str) -> Option<u64> {
    let secs: f64 = literal.parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some((secs * 1000.0).round() as u64)
}
