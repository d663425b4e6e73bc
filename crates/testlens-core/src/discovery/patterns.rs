//! Regex patterns used by the line scanner.
//!
//! All patterns are matched against a single source line. None of them try
//! to understand string or comment contents.

/// `mod name {`, optionally `pub` / `pub(crate)`.
pub const MODULE_DECL: &str = r"^\s*(?:pub(?:\s*\([^)]*\))?\s+)?mod\s+(\w+)\s*\{";

/// `#[cfg(test)]`
pub const CFG_TEST: &str = r"^\s*#\[\s*cfg\s*\(\s*test\s*\)\s*\]";

/// Plain unit-test marker: `#[test]`.
pub const PLAIN_TEST: &str = r"^\s*#\[\s*test\s*\]";

/// Framework integration marker: any path ending in `::test`,
/// e.g. `#[tokio::test]` or `#[tokio::test(flavor = "multi_thread")]`.
pub const INTEGRATION_TEST: &str = r"^\s*#\[\s*(?:\w+\s*::\s*)+test\b(?:\s*\([^\]]*\))?\s*\]";

/// `#[ignore]` or `#[ignore = "reason"]`.
pub const IGNORE_ATTR: &str = r"^\s*#\[\s*ignore\b";

/// Any outer or inner attribute.
pub const ATTRIBUTE: &str = r"^\s*#!?\[";

/// Function signature. Group 1 is the async qualifier, group 2 the name.
pub const FN_SIGNATURE: &str = r#"^\s*(?:pub(?:\s*\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(async\s+)?(?:unsafe\s+)?(?:extern\s+(?:"[^"]*"\s+)?)?fn\s+(\w+)"#;

/// Module names that mark a test module on their own.
pub const TEST_MODULE_NAMES: &[&str] = &["test", "tests"];
