//! Output correlation: attribute runner output lines to the test that produced them.
//!
//! The [`Correlator`] is a small state machine driven one ANSI-stripped line
//! at a time, in the order the runner emitted them:
//!
//! - `Idle` - no test is open; free text is not attributed.
//! - `InTest(name)` - every line, starting with the start marker, is appended
//!   to `name`'s span until a finish marker closes it.
//! - `InFailureDetail(name)` - libtest's `---- name stdout ----` section
//!   printed after the run; appended to `name`'s span.
//!
//! Committed spans are merged into a per-test output map. Nothing is
//! dropped: a new start marker flushes the open span first, and
//! [`Correlator::finish`] flushes whatever is still open at stream end.
//!
//! Runners that genuinely interleave concurrent test output without framing
//! markers cannot be demultiplexed here; a finish marker always closes the
//! currently open span.

mod ansi;
pub mod matching;

pub use ansi::strip_ansi;
pub use matching::{resolve_key, short_name, MatchTier};

use std::collections::BTreeMap;
use tracing::debug;

use crate::parser::LineEvent;

/// A contiguous run of output attributed to one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    InTest {
        name: String,
        buf: String,
    },
    InFailureDetail {
        name: String,
        buf: String,
    },
}

/// Per-run output correlator.
#[derive(Debug, Default)]
pub struct Correlator {
    state: State,
    spans: BTreeMap<String, String>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one ANSI-stripped line along with its classification.
    ///
    /// Returns the spans committed by this line, in commit order.
    pub fn observe(&mut self, line: &str, event: Option<&LineEvent>) -> Vec<Span> {
        let mut committed = Vec::new();

        match event {
            Some(LineEvent::Started { name }) => {
                if let Some(span) = self.flush() {
                    debug!(open = %span.name, next = %name, "start marker while a span was open");
                    committed.push(span);
                }
                self.state = State::InTest {
                    name: name.clone(),
                    buf: with_newline(line),
                };
            }

            Some(LineEvent::Finished { name: finished, .. }) => {
                match std::mem::take(&mut self.state) {
                    State::InTest { name, mut buf } => {
                        if &name != finished {
                            debug!(
                                open = %name,
                                finished = %finished,
                                "finish marker names a different test; closing the open span"
                            );
                        }
                        push_line(&mut buf, line);
                        committed.push(self.commit(name, buf));
                    }
                    State::InFailureDetail { name, buf } => {
                        committed.push(self.commit(name, trim_trailing_blank(buf)));
                        committed.push(self.commit(finished.clone(), with_newline(line)));
                    }
                    State::Idle => {
                        // libtest prints `test name ... ok` on one line when the
                        // test wrote nothing; that line is the whole span.
                        committed.push(self.commit(finished.clone(), with_newline(line)));
                    }
                }
            }

            Some(LineEvent::FailureHeader { name }) => {
                committed.extend(self.flush());
                self.state = State::InFailureDetail {
                    name: name.clone(),
                    buf: with_newline(line),
                };
            }

            Some(LineEvent::FailureListStart) | Some(LineEvent::Summary { .. }) => {
                if matches!(self.state, State::InFailureDetail { .. }) {
                    committed.extend(self.flush());
                } else if let State::InTest { buf, .. } = &mut self.state {
                    push_line(buf, line);
                }
            }

            Some(LineEvent::Planned { .. }) | None => match &mut self.state {
                State::InTest { buf, .. } | State::InFailureDetail { buf, .. } => {
                    push_line(buf, line)
                }
                State::Idle => {}
            },
        }

        committed
    }

    /// Flush the open span, if any, at stream end, stop, or transport failure.
    pub fn finish(&mut self) -> Option<Span> {
        self.flush()
    }

    /// Name of the test currently being attributed, if any.
    pub fn current(&self) -> Option<&str> {
        match &self.state {
            State::InTest { name, .. } | State::InFailureDetail { name, .. } => Some(name),
            State::Idle => None,
        }
    }

    /// Committed per-test output.
    pub fn spans(&self) -> &BTreeMap<String, String> {
        &self.spans
    }

    /// Committed output for an exact key.
    pub fn output_for(&self, key: &str) -> Option<&str> {
        self.spans.get(key).map(String::as_str)
    }

    fn flush(&mut self) -> Option<Span> {
        match std::mem::take(&mut self.state) {
            State::Idle => None,
            State::InTest { name, buf } => Some(self.commit(name, buf)),
            State::InFailureDetail { name, buf } => {
                Some(self.commit(name, trim_trailing_blank(buf)))
            }
        }
    }

    /// Merge `text` into the output map under `name`.
    fn commit(&mut self, name: String, text: String) -> Span {
        self.spans.entry(name.clone()).or_default().push_str(&text);
        Span { name, text }
    }
}

fn with_newline(line: &str) -> String {
    let mut buf = String::with_capacity(line.len() + 1);
    push_line(&mut buf, line);
    buf
}

fn push_line(buf: &mut String, line: &str) {
    buf.push_str(line);
    buf.push('\n');
}

fn trim_trailing_blank(mut buf: String) -> String {
    let kept = buf.trim_end().len();
    buf.truncate(kept);
    if !buf.is_empty() {
        buf.push('\n');
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::classify_line;

    fn feed(correlator: &mut Correlator, lines: &[&str]) -> Vec<Span> {
        lines
            .iter()
            .flat_map(|line| {
                let event = classify_line(line);
                correlator.observe(line, event.as_ref())
            })
            .collect()
    }

    #[test]
    fn test_spans_do_not_cross_contaminate() {
        let mut c = Correlator::new();
        feed(
            &mut c,
            &[
                "test a ... ",
                "line A1",
                "test a ... ok",
                "test b ... ",
                "line B1",
                "test b ... FAILED",
            ],
        );

        assert_eq!(c.output_for("a"), Some("test a ... \nline A1\ntest a ... ok\n"));
        assert_eq!(c.output_for("b"), Some("test b ... \nline B1\ntest b ... FAILED\n"));
        assert_eq!(c.current(), None);
    }

    #[test]
    fn test_truncated_stream_is_flushed() {
        let mut c = Correlator::new();
        feed(&mut c, &["test a ... ", "line A1"]);
        assert_eq!(c.current(), Some("a"));

        let span = c.finish().unwrap();
        assert_eq!(span.name, "a");
        assert_eq!(c.output_for("a"), Some("test a ... \nline A1\n"));
        assert!(c.finish().is_none());
    }

    #[test]
    fn test_start_without_finish_flushes_previous() {
        let mut c = Correlator::new();
        let committed = feed(&mut c, &["test a ... ", "partial", "test b ... "]);

        assert_eq!(committed.len(), 1);
        assert_eq!(c.output_for("a"), Some("test a ... \npartial\n"));
        assert_eq!(c.current(), Some("b"));
    }

    #[test]
    fn test_mismatched_finish_closes_open_span() {
        let mut c = Correlator::new();
        feed(&mut c, &["test a ... ", "out", "test z ... ok"]);

        assert_eq!(c.output_for("a"), Some("test a ... \nout\ntest z ... ok\n"));
        assert_eq!(c.output_for("z"), None);
    }

    #[test]
    fn test_finish_in_idle_is_a_one_line_span() {
        let mut c = Correlator::new();
        feed(&mut c, &["running 2 tests", "test a ... ok", "test b ... ignored"]);

        assert_eq!(c.output_for("a"), Some("test a ... ok\n"));
        assert_eq!(c.output_for("b"), Some("test b ... ignored\n"));
    }

    #[test]
    fn test_failure_detail_is_merged_into_span() {
        let mut c = Correlator::new();
        feed(
            &mut c,
            &[
                "test tests::boom ... FAILED",
                "",
                "failures:",
                "",
                "---- tests::boom stdout ----",
                "thread 'tests::boom' panicked at src/lib.rs:9:9:",
                "boom",
                "",
                "",
                "failures:",
                "    tests::boom",
                "",
                "test result: FAILED. 0 passed; 1 failed; 0 ignored; 0 measured; 0 filtered out; finished in 0.00s",
            ],
        );

        let output = c.output_for("tests::boom").unwrap();
        assert!(output.starts_with("test tests::boom ... FAILED\n"));
        assert!(output.contains("---- tests::boom stdout ----\n"));
        assert!(output.ends_with("boom\n"));
        assert!(!output.contains("    tests::boom"));
    }
}
