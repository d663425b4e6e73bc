//! Test discovery from Rust source text.
//!
//! Discovery is a lightweight, line-oriented scan for test attributes and
//! the function signatures they decorate. It tracks enclosing `mod` blocks so
//! every [`TestFunction`] carries its module path.
//!
//! # Components
//!
//! - [`discover`] - scan a single file's content
//! - [`group_by_file`] - group discovered tests into [`TestFile`]s
//! - [`discover_directory`] - walk a project tree and scan every source file
//! - [`DiscoveryCache`] - skip re-scanning files whose content hash is unchanged
//!
//! # Example
//!
//! ```
//! use testlens_core::discovery::discover;
//!
//! let source = "mod tests {\n    #[test]\n    fn adds_correctly() {}\n}\n";
//! let tests = discover("src/lib.rs", source);
//!
//! assert_eq!(tests.len(), 1);
//! assert_eq!(tests[0].qualified_name(), "tests::adds_correctly");
//! ```

mod cache;
mod error;
mod patterns;
mod scanner;
mod walk;

pub use cache::DiscoveryCache;
pub use error::DiscoveryError;
pub use walk::discover_directory;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use scanner::Scanner;

/// Which test attribute introduced a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestMarker {
    /// `#[test]`
    Plain,
    /// A framework attribute such as `#[tokio::test]`.
    Integration,
}

/// One discovered test function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFunction {
    /// Function name
    pub name: String,

    /// Path of the file the test was found in
    pub file_path: String,

    /// 1-based line of the test attribute
    pub line_number: u32,

    /// Whether the signature is `async fn`
    pub is_async: bool,

    /// Whether the marker was a framework attribute rather than `#[test]`
    pub is_integration: bool,

    /// Enclosing module names, outermost first
    pub module_path: Vec<String>,

    /// Whether an `#[ignore]` attribute sits between marker and signature
    pub is_ignored: bool,
}

impl TestFunction {
    /// Fully scoped name, e.g. `tests::parser::adds_correctly`.
    pub fn qualified_name(&self) -> String {
        if self.module_path.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.module_path.join("::"), self.name)
        }
    }

    /// The marker flavor that introduced this test.
    pub fn marker(&self) -> TestMarker {
        if self.is_integration {
            TestMarker::Integration
        } else {
            TestMarker::Plain
        }
    }
}

/// Tests discovered in one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFile {
    pub path: String,
    pub tests: Vec<TestFunction>,
}

/// Side information from one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// A `#[cfg(test)]` attribute or a `test`/`tests` module was seen.
    pub saw_test_module: bool,

    /// Brace depth at end of file. Non-zero means unbalanced input.
    pub final_depth: usize,

    /// Markers that never reached a function signature.
    pub discarded_markers: usize,
}

/// Discover test functions in a file's content.
///
/// Never fails: a file without tests yields an empty vector, and malformed
/// input only degrades module attribution.
pub fn discover(file_path: &str, content: &str) -> Vec<TestFunction> {
    discover_with_summary(file_path, content).0
}

/// Like [`discover`], also returning scan diagnostics.
pub fn discover_with_summary(file_path: &str, content: &str) -> (Vec<TestFunction>, ScanSummary) {
    Scanner::new(file_path).scan(content)
}

/// Group tests by file path. Files are ordered by path; tests keep scan order.
pub fn group_by_file(tests: impl IntoIterator<Item = TestFunction>) -> Vec<TestFile> {
    let mut by_path: BTreeMap<String, Vec<TestFunction>> = BTreeMap::new();
    for test in tests {
        by_path.entry(test.file_path.clone()).or_default().push(test);
    }

    by_path
        .into_iter()
        .map(|(path, tests)| TestFile { path, tests })
        .collect()
}
