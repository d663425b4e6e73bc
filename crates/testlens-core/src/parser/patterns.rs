//! Line shapes printed by libtest-compatible runners.
//!
//! Patterns are matched against ANSI-stripped lines with the trailing newline
//! removed.

/// `test tests::adds ... ` with nothing after the ellipsis.
pub const TEST_STARTED: &str = r"^test (.+?) \.\.\.\s*$";

/// `test tests::adds ... ok <0.003s>`. Group 1 name, group 2 outcome, group 3 rest.
pub const TEST_FINISHED: &str = r"^test (.+?) \.\.\. (?i:(ok|failed|ignored))\b(.*)$";

/// `N passed; M failed; K ignored`, anywhere on the line.
pub const SUMMARY_COUNTS: &str = r"(\d+) passed; (\d+) failed; (\d+) ignored";

/// `finished in 0.01s`
pub const SUMMARY_DURATION: &str = r"finished in (\d+(?:\.\d+)?)s";

/// `running 3 tests`
pub const PLANNED: &str = r"^running (\d+) tests?$";

/// `---- tests::adds stdout ----`
pub const FAILURE_HEADER: &str = r"^---- (.+?) std(?:out|err) ----$";

/// Literal heading of libtest's failure section.
pub const FAILURE_LIST: &str = "failures:";

/// Bracketed duration after the outcome: `<0.003s>` or `(0.003s)`.
pub const BRACKETED_DURATION: &str = r"[<(\[]\s*(\d+(?:\.\d+)?)\s*s\s*[>)\]]";

/// A bare duration that is the whole remainder: ` 0.003s`.
pub const BARE_DURATION: &str = r"^\s*(\d+(?:\.\d+)?)s\s*$";

/// Suffix libtest appends to `#[should_panic]` test names.
pub const SHOULD_PANIC_SUFFIX: &str = " - should panic";
