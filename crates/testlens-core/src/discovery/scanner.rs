//! Line-oriented test scanner.
//!
//! This is a heuristic, not a parser. Brace depth is the net count of `{`
//! and `}` per line, so braces inside string literals or comments skew module
//! attribution. Scanning never aborts on malformed input.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use super::patterns::{
    ATTRIBUTE, CFG_TEST, FN_SIGNATURE, IGNORE_ATTR, INTEGRATION_TEST, MODULE_DECL, PLAIN_TEST,
    TEST_MODULE_NAMES,
};
use super::{ScanSummary, TestFunction, TestMarker};

static MODULE_DECL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(MODULE_DECL).unwrap());
static CFG_TEST_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(CFG_TEST).unwrap());
static PLAIN_TEST_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(PLAIN_TEST).unwrap());
static INTEGRATION_TEST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(INTEGRATION_TEST).unwrap());
static IGNORE_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(IGNORE_ATTR).unwrap());
static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(ATTRIBUTE).unwrap());
static FN_SIGNATURE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(FN_SIGNATURE).unwrap());

/// A test marker waiting for its function signature.
#[derive(Debug, Clone, Copy)]
struct PendingMarker {
    kind: TestMarker,
    line: u32,
    ignored: bool,
}

/// An open `mod name {` block and the depth it was opened at.
#[derive(Debug)]
struct ModuleFrame {
    name: String,
    depth: usize,
}

/// Scanner state for one file.
pub(super) struct Scanner<'a> {
    file_path: &'a str,
    depth: usize,
    modules: Vec<ModuleFrame>,
    pending: Option<PendingMarker>,
    in_block_comment: bool,
    saw_test_module: bool,
    discarded_markers: usize,
    tests: Vec<TestFunction>,
}

impl<'a> Scanner<'a> {
    pub(super) fn new(file_path: &'a str) -> Self {
        Self {
            file_path,
            depth: 0,
            modules: Vec::new(),
            pending: None,
            in_block_comment: false,
            saw_test_module: false,
            discarded_markers: 0,
            tests: Vec::new(),
        }
    }

    /// Scan the whole content and return discovered tests.
    pub(super) fn scan(mut self, content: &str) -> (Vec<TestFunction>, ScanSummary) {
        for (idx, line) in content.lines().enumerate() {
            self.scan_line(idx as u32 + 1, line);
        }

        if self.pending.is_some() {
            self.discarded_markers += 1;
        }

        let summary = ScanSummary {
            saw_test_module: self.saw_test_module,
            final_depth: self.depth,
            discarded_markers: self.discarded_markers,
        };
        (self.tests, summary)
    }

    fn scan_line(&mut self, line_number: u32, line: &str) {
        let depth_before = self.depth;
        let comment_only = is_blank_or_comment(line, self.in_block_comment);
        self.in_block_comment = ends_inside_block_comment(line, self.in_block_comment);

        if CFG_TEST_RE.is_match(line) {
            self.saw_test_module = true;
        }

        let marker = if comment_only { None } else { marker_kind(line) };
        if let Some(kind) = marker {
            if let Some(prev) = self.pending {
                trace!(file = self.file_path, line = prev.line, "test marker superseded");
            }
            let mut pending = PendingMarker {
                kind,
                line: line_number,
                ignored: false,
            };

            // `#[test] #[ignore] fn name()` on one line.
            let rest = marker_remainder(line);
            let (rest, ignored) = strip_leading_attributes(rest);
            pending.ignored = ignored;
            if let Some(caps) = FN_SIGNATURE_RE.captures(rest) {
                self.emit(pending, &caps);
            } else {
                self.pending = Some(pending);
            }
        } else if let Some(mut pending) = self.pending.take() {
            if comment_only {
                self.pending = Some(pending);
            } else if let Some(caps) = FN_SIGNATURE_RE.captures(line) {
                self.emit(pending, &caps);
            } else if ATTRIBUTE_RE.is_match(line) {
                if IGNORE_ATTR_RE.is_match(line) {
                    pending.ignored = true;
                }
                self.pending = Some(pending);
            } else {
                trace!(
                    file = self.file_path,
                    marker_line = pending.line,
                    line = line_number,
                    "test marker not followed by a function, discarded"
                );
                self.discarded_markers += 1;
            }
        }

        if let Some(caps) = MODULE_DECL_RE.captures(line) {
            let name = caps[1].to_string();
            if TEST_MODULE_NAMES.contains(&name.as_str()) {
                self.saw_test_module = true;
            }
            self.modules.push(ModuleFrame {
                name,
                depth: depth_before,
            });
        }

        let (opens, closes) = count_braces(line);
        self.depth = (self.depth + opens).saturating_sub(closes);

        while let Some(top) = self.modules.last() {
            if self.depth <= top.depth {
                self.modules.pop();
            } else {
                break;
            }
        }
    }

    fn emit(&mut self, marker: PendingMarker, caps: &regex::Captures<'_>) {
        let name = caps[2].to_string();
        self.tests.push(TestFunction {
            name,
            file_path: self.file_path.to_string(),
            line_number: marker.line,
            is_async: caps.get(1).is_some(),
            is_integration: marker.kind == TestMarker::Integration,
            module_path: self.modules.iter().map(|m| m.name.clone()).collect(),
            is_ignored: marker.ignored,
        });
    }
}

fn marker_kind(line: &str) -> Option<TestMarker> {
    if PLAIN_TEST_RE.is_match(line) {
        Some(TestMarker::Plain)
    } else if INTEGRATION_TEST_RE.is_match(line) {
        Some(TestMarker::Integration)
    } else {
        None
    }
}

/// Text after the marker attribute on the same line.
fn marker_remainder(line: &str) -> &str {
    PLAIN_TEST_RE
        .find(line)
        .or_else(|| INTEGRATION_TEST_RE.find(line))
        .map(|m| &line[m.end()..])
        .unwrap_or("")
}

/// Skip `#[...]` attributes at the start of `rest`, reporting whether one was `#[ignore]`.
fn strip_leading_attributes(mut rest: &str) -> (&str, bool) {
    let mut ignored = false;
    loop {
        let trimmed = rest.trim_start();
        if !trimmed.starts_with("#[") {
            return (rest, ignored);
        }
        if IGNORE_ATTR_RE.is_match(trimmed) {
            ignored = true;
        }
        match trimmed.find(']') {
            Some(end) => rest = &trimmed[end + 1..],
            None => return ("", ignored),
        }
    }
}

/// True if `line` holds nothing but whitespace and comments. `in_block` is
/// whether the line starts inside a `/* */` comment.
fn is_blank_or_comment(line: &str, in_block: bool) -> bool {
    let mut rest = line.trim();
    let mut inside = in_block;
    loop {
        if inside {
            match rest.find("*/") {
                Some(end) => {
                    rest = rest[end + 2..].trim_start();
                    inside = false;
                }
                None => return true,
            }
        } else if rest.is_empty() || rest.starts_with("//") {
            return true;
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after;
            inside = true;
        } else {
            return false;
        }
    }
}

/// Whether a `/* */` comment is still open at the end of `line`.
fn ends_inside_block_comment(line: &str, in_block: bool) -> bool {
    let mut rest = line;
    let mut inside = in_block;
    loop {
        if inside {
            match rest.find("*/") {
                Some(end) => {
                    rest = &rest[end + 2..];
                    inside = false;
                }
                None => return true,
            }
        } else {
            let open = rest.find("/*");
            let line_comment = rest.find("//");
            match open {
                Some(start) if line_comment.map_or(true, |lc| start < lc) => {
                    rest = &rest[start + 2..];
                    inside = true;
                }
                _ => return false,
            }
        }
    }
}

fn count_braces(line: &str) -> (usize, usize) {
    line.chars().fold((0, 0), |(opens, closes), c| match c {
        '{' => (opens + 1, closes),
        '}' => (opens, closes + 1),
        _ => (opens, closes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_kind() {
        assert_eq!(marker_kind("    #[test]"), Some(TestMarker::Plain));
        assert_eq!(marker_kind("#[tokio::test]"), Some(TestMarker::Integration));
        assert_eq!(
            marker_kind(r#"  #[tokio::test(flavor = "multi_thread")]"#),
            Some(TestMarker::Integration)
        );
        assert_eq!(marker_kind("#[cfg(test)]"), None);
        assert_eq!(marker_kind("#[testing]"), None);
    }

    #[test]
    fn test_strip_leading_attributes() {
        let (rest, ignored) = strip_leading_attributes(" #[ignore] fn slow() {}");
        assert!(ignored);
        assert_eq!(rest.trim(), "fn slow() {}");

        let (rest, ignored) = strip_leading_attributes(" fn quick() {}");
        assert!(!ignored);
        assert_eq!(rest, " fn quick() {}");
    }

    #[test]
    fn test_count_braces() {
        assert_eq!(count_braces("} else {"), (1, 1));
        assert_eq!(count_braces("fn a() { if x { y } }"), (2, 2));
        assert_eq!(count_braces("let x = 1;"), (0, 0));
    }

    #[test]
    fn test_comment_lines() {
        assert!(is_blank_or_comment("", false));
        assert!(is_blank_or_comment("   // note", false));
        assert!(is_blank_or_comment("/// docs", false));
        assert!(is_blank_or_comment("/* a */ // b", false));
        assert!(is_blank_or_comment(" * continued", true));
        assert!(is_blank_or_comment(" */", true));
        assert!(!is_blank_or_comment(" */ let x = 1;", true));
        assert!(!is_blank_or_comment("let x = 1;", false));
        assert!(!is_blank_or_comment("*slot = 1;", false));
        assert!(!is_blank_or_comment("let x = 1; /* note */", false));
    }

    #[test]
    fn test_block_comment_state() {
        assert!(ends_inside_block_comment("/* open", false));
        assert!(ends_inside_block_comment(" * still", true));
        assert!(!ends_inside_block_comment(" */", true));
        assert!(!ends_inside_block_comment("let x = 1; /* note */", false));
        assert!(!ends_inside_block_comment("// not /* a block", false));
        assert!(ends_inside_block_comment("/* a */ /* b", false));
    }

    #[test]
    fn test_code_after_marker_is_not_mistaken_for_comment() {
        for source in [
            "#[test]\n*slot = 1;\nfn not_a_test() {}\n",
            "#[test]\nlet x = 1; /* note */\nfn not_a_test() {}\n",
        ] {
            let (tests, summary) = Scanner::new("lib.rs").scan(source);
            assert!(tests.is_empty(), "{source:?}");
            assert_eq!(summary.discarded_markers, 1);
        }
    }

    #[test]
    fn test_block_comment_between_marker_and_fn() {
        let source = "#[test]\n/* a\n * b\n */\nfn kept() {}\n";
        let (tests, summary) = Scanner::new("lib.rs").scan(source);
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].name, "kept");
        assert_eq!(summary.discarded_markers, 0);
    }

    #[test]
    fn test_marker_inside_block_comment_is_ignored() {
        let source = "/*\n#[test]\nfn commented_out() {}\n*/\n";
        let (tests, summary) = Scanner::new("lib.rs").scan(source);
        assert!(tests.is_empty());
        assert_eq!(summary.discarded_markers, 0);
    }
}
